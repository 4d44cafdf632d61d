//! Feature vector construction with per-slot provenance

use super::catalog::{CatalogEntry, FEATURE_CATALOG, FEATURE_COUNT};
use aquasense_common::{MeasuredReading, WaterParameter};
use serde::Serialize;

/// Whether a slot holds a measured value or a catalog default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Measured,
    Default,
}

/// Fixed-length classifier input
///
/// Every slot is populated. Provenance is kept alongside so that callers can
/// tell real measurements from substituted defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
    provenance: [Provenance; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector from a sparse reading
    ///
    /// Present finite values are copied as measured; absent slots take the
    /// catalog default. Parameters without a slot are ignored. Pure: the same
    /// reading always yields the same vector.
    pub fn build(reading: &MeasuredReading) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        let mut provenance = [Provenance::Default; FEATURE_COUNT];

        for (slot, entry) in FEATURE_CATALOG.iter().enumerate() {
            match reading.get(entry.parameter) {
                Some(v) if v.is_finite() => {
                    values[slot] = v;
                    provenance[slot] = Provenance::Measured;
                }
                _ => values[slot] = entry.default,
            }
        }

        Self { values, provenance }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn provenance(&self) -> &[Provenance; FEATURE_COUNT] {
        &self.provenance
    }

    pub fn measured_count(&self) -> usize {
        self.provenance
            .iter()
            .filter(|p| **p == Provenance::Measured)
            .count()
    }

    /// Iterate `(entry, value, provenance)` in slot order
    pub fn slots(&self) -> impl Iterator<Item = (&'static CatalogEntry, f64, Provenance)> + '_ {
        FEATURE_CATALOG
            .iter()
            .zip(self.values.iter().zip(self.provenance.iter()))
            .map(|(entry, (v, p))| (entry, *v, *p))
    }

    pub fn measured_parameters(&self) -> Vec<WaterParameter> {
        self.with_provenance(Provenance::Measured)
    }

    pub fn defaulted_parameters(&self) -> Vec<WaterParameter> {
        self.with_provenance(Provenance::Default)
    }

    fn with_provenance(&self, wanted: Provenance) -> Vec<WaterParameter> {
        self.slots()
            .filter(|(_, _, p)| *p == wanted)
            .map(|(entry, _, _)| entry.parameter)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::catalog::slot_of;

    #[test]
    fn test_empty_reading_is_all_defaults() {
        let vector = FeatureVector::build(&MeasuredReading::default());

        assert_eq!(vector.measured_count(), 0);
        for (slot, entry) in FEATURE_CATALOG.iter().enumerate() {
            assert_eq!(vector.values()[slot], entry.default);
            assert_eq!(vector.provenance()[slot], Provenance::Default);
        }
    }

    #[test]
    fn test_measured_values_override_defaults() {
        let reading = MeasuredReading::new("t")
            .with(WaterParameter::Ph, 7.5)
            .with(WaterParameter::Temperature, 28.0)
            .with(WaterParameter::Ammonia, 1.5);

        let vector = FeatureVector::build(&reading);
        let ammonia = slot_of(WaterParameter::Ammonia).unwrap();

        assert_eq!(vector.measured_count(), 3);
        assert_eq!(vector.values()[ammonia], 1.5);
        assert_eq!(vector.provenance()[ammonia], Provenance::Measured);
        assert_eq!(
            vector.measured_parameters(),
            vec![WaterParameter::Temperature, WaterParameter::Ph, WaterParameter::Ammonia]
        );
    }

    #[test]
    fn test_measured_value_equal_to_default_is_still_measured() {
        // pH default is 7.5; a real 7.5 reading must not be reported as defaulted
        let reading = MeasuredReading::new("t").with(WaterParameter::Ph, 7.5);
        let vector = FeatureVector::build(&reading);

        assert!(vector.measured_parameters().contains(&WaterParameter::Ph));
        assert!(!vector.defaulted_parameters().contains(&WaterParameter::Ph));
    }

    #[test]
    fn test_non_finite_value_falls_back_to_default() {
        let reading = MeasuredReading::new("t").with(WaterParameter::Temperature, f64::NAN);
        let vector = FeatureVector::build(&reading);

        assert_eq!(vector.values()[0], 26.0);
        assert_eq!(vector.provenance()[0], Provenance::Default);
    }

    #[test]
    fn test_parameters_without_slot_are_ignored() {
        let reading = MeasuredReading::new("t")
            .with(WaterParameter::Nitrate, 20.0)
            .with(WaterParameter::Salinity, 0.5);
        let vector = FeatureVector::build(&reading);

        assert_eq!(vector.measured_count(), 0);
        assert_eq!(vector.defaulted_parameters().len(), FEATURE_COUNT);
    }

    #[test]
    fn test_build_is_deterministic() {
        let reading = MeasuredReading::new("t")
            .with(WaterParameter::DissolvedOxygen, 6.5)
            .with(WaterParameter::Nitrite, 0.008);
        assert_eq!(FeatureVector::build(&reading), FeatureVector::build(&reading));
    }
}
