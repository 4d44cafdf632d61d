//! Reference information for the disease classifier's label set

use crate::types::DiseaseSeverity;

/// Label the classifier uses for "no disease"
pub const HEALTHY_LABEL: &str = "Healthy Fish";

/// Class labels in model output order, used when an artifact ships without labels
pub const DEFAULT_LABELS: [&str; 7] = [
    "Bacterial Red disease",
    "Bacterial diseases - Aeromoniasis",
    "Bacterial gill disease",
    "Fungal diseases Saprolegniasis",
    HEALTHY_LABEL,
    "Parasitic diseases",
    "Viral diseases White tail disease",
];

#[derive(Debug, Clone, Copy)]
pub struct DiseaseProfile {
    /// Model label
    pub label: &'static str,
    /// Display name
    pub name: &'static str,
    pub description: &'static str,
    /// Inherent severity of the condition when present
    pub severity: DiseaseSeverity,
    /// Contagious or commonly fatal; high-confidence detection demands action
    pub serious: bool,
    pub causes: &'static [&'static str],
    pub symptoms: &'static [&'static str],
    pub treatment: &'static str,
    pub prevention: &'static [&'static str],
}

pub const DISEASE_CATALOG: [DiseaseProfile; 7] = [
    DiseaseProfile {
        label: "Bacterial Red disease",
        name: "Bacterial Red Disease",
        description: "Bacterial hemorrhagic septicemia causing red lesions and hemorrhaging.",
        severity: DiseaseSeverity::High,
        serious: true,
        causes: &["Aeromonas bacteria", "Poor water quality", "Stress", "Physical injuries"],
        symptoms: &["Red lesions on body", "Hemorrhages on skin and fins", "Ulcers", "Lethargy", "Loss of appetite"],
        treatment: "Quarantine infected fish immediately. Use antibiotics (oxytetracycline or florfenicol) as prescribed. Improve water quality, increase aeration, and consider a 1-3% salt bath.",
        prevention: &["Maintain excellent water quality", "Regular water changes", "Avoid overcrowding", "Quarantine new fish"],
    },
    DiseaseProfile {
        label: "Bacterial diseases - Aeromoniasis",
        name: "Aeromoniasis (Motile Aeromonas Septicemia)",
        description: "Systemic bacterial infection caused by Aeromonas species, leading to septicemia and organ damage.",
        severity: DiseaseSeverity::High,
        serious: true,
        causes: &["Aeromonas hydrophila bacteria", "Poor water quality", "High organic load", "Temperature fluctuations"],
        symptoms: &["Hemorrhages on body", "Fin rot", "Ulcers", "Swollen abdomen", "Bulging eyes"],
        treatment: "Antibiotic treatment (oxytetracycline, sulfonamides) as prescribed. Improve water quality immediately, raise dissolved oxygen, and reduce stocking density.",
        prevention: &["Maintain optimal water parameters", "Regular monitoring", "Proper feeding", "Disinfect equipment"],
    },
    DiseaseProfile {
        label: "Bacterial gill disease",
        name: "Bacterial Gill Disease",
        description: "Bacterial infection of gill tissue that impairs respiration.",
        severity: DiseaseSeverity::High,
        serious: true,
        causes: &["Flavobacterium branchiophilum", "High ammonia levels", "Overcrowding", "Low dissolved oxygen"],
        symptoms: &["Rapid gill movement", "Gasping at surface", "Pale or swollen gills", "Excess mucus on gills"],
        treatment: "Improve water quality and aeration immediately. Reduce feeding temporarily. Treat with chloramine-T or a hydrogen peroxide bath.",
        prevention: &["Keep dissolved oxygen above 5 mg/L", "Keep ammonia at 0 mg/L", "Proper filtration", "Avoid overcrowding"],
    },
    DiseaseProfile {
        label: "Fungal diseases Saprolegniasis",
        name: "Saprolegniasis (Fungal Infection)",
        description: "Opportunistic Saprolegnia infection appearing as cotton-like growth on body, fins, or eggs.",
        severity: DiseaseSeverity::Medium,
        serious: false,
        causes: &["Saprolegnia fungus", "Physical injury", "Low temperature", "Weakened immune system"],
        symptoms: &["White or gray cotton-like growth", "Fluffy patches on body or fins", "Fin deterioration"],
        treatment: "Salt bath (0.5-1% for 10-15 minutes). Antifungal medication such as methylene blue or potassium permanganate. Remove dead tissue if severe.",
        prevention: &["Handle fish carefully", "Maintain good water quality", "Quarantine injured fish"],
    },
    DiseaseProfile {
        label: HEALTHY_LABEL,
        name: "Healthy Fish - No Disease Detected",
        description: "No visible signs of disease or distress.",
        severity: DiseaseSeverity::None,
        serious: false,
        causes: &[],
        symptoms: &["Active swimming", "Normal appetite", "Bright coloration", "Intact fins"],
        treatment: "No treatment needed. Continue regular monitoring and maintenance.",
        prevention: &["Maintain optimal water quality", "Monitor water parameters weekly", "Quarantine new fish"],
    },
    DiseaseProfile {
        label: "Parasitic diseases",
        name: "Parasitic Infections",
        description: "External or internal parasites such as Ich, Trichodina, flukes, anchor worms, or lice.",
        severity: DiseaseSeverity::Medium,
        serious: false,
        causes: &["Ichthyophthirius (Ich)", "Gill and skin flukes", "Introduction of infected fish", "Poor quarantine"],
        symptoms: &["White spots on body", "Scratching or flashing", "Excess mucus", "Clamped fins"],
        treatment: "Identify the parasite. For Ich raise temperature gradually and use a 1-2% salt treatment. Use formalin or potassium permanganate baths for external parasites and medicated feed for internal ones.",
        prevention: &["Quarantine new fish for 2-3 weeks", "Disinfect equipment", "Regular inspection"],
    },
    DiseaseProfile {
        label: "Viral diseases White tail disease",
        name: "Viral White Tail Disease",
        description: "Highly contagious viral infection causing white tail discoloration and systemic illness; often fatal.",
        severity: DiseaseSeverity::Critical,
        serious: true,
        causes: &["Viral pathogen", "Infected fish introduction", "Contaminated water", "Poor biosecurity"],
        symptoms: &["White discoloration of tail", "Tail necrosis", "Abnormal swimming", "High mortality"],
        treatment: "No specific antiviral treatment. Quarantine infected fish immediately, cull severely affected fish, and disinfect all equipment and tanks.",
        prevention: &["Source certified disease-free stock", "Strict quarantine (3-4 weeks)", "Do not share equipment between tanks"],
    },
];

/// Look up a profile by model label or display name (case-insensitive)
pub fn profile(name: &str) -> Option<&'static DiseaseProfile> {
    let name = name.trim();
    DISEASE_CATALOG
        .iter()
        .find(|p| p.label.eq_ignore_ascii_case(name) || p.name.eq_ignore_ascii_case(name))
}
