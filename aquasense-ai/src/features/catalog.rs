//! Feature catalog: slot order, model column names, and fill-in defaults
//!
//! The order and column names must match the classifier artifact exactly;
//! [`crate::classifier::forest::RandomForest`] refuses artifacts whose
//! feature names differ.

use aquasense_common::WaterParameter;

/// Number of slots in the classifier's input vector
pub const FEATURE_COUNT: usize = 14;

/// One input slot of the classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub parameter: WaterParameter,
    /// Column name the model was trained with
    pub model_column: &'static str,
    /// Typical value substituted when the reading lacks this parameter
    pub default: f64,
}

const fn entry(parameter: WaterParameter, model_column: &'static str, default: f64) -> CatalogEntry {
    CatalogEntry {
        parameter,
        model_column,
        default,
    }
}

/// Slots in model input order
pub const FEATURE_CATALOG: [CatalogEntry; FEATURE_COUNT] = [
    entry(WaterParameter::Temperature, "Temp", 26.0),
    entry(WaterParameter::Turbidity, "Turbidity__cm_", 5.0),
    entry(WaterParameter::DissolvedOxygen, "DO_mg_L_", 7.0),
    entry(WaterParameter::Bod, "BOD__mg_L_", 3.0),
    entry(WaterParameter::Co2, "CO2", 5.0),
    entry(WaterParameter::Ph, "pH", 7.5),
    entry(WaterParameter::Alkalinity, "Alkalinity__mg_L_1__", 100.0),
    entry(WaterParameter::Hardness, "Hardness__mg_L_1__", 150.0),
    entry(WaterParameter::Calcium, "Calcium__mg_L_1__", 60.0),
    entry(WaterParameter::Ammonia, "Ammonia__mg_L_1__", 0.01),
    entry(WaterParameter::Nitrite, "Nitrite__mg_L_1__", 0.01),
    entry(WaterParameter::Phosphorus, "Phosphorus__mg_L_1__", 0.05),
    entry(WaterParameter::H2s, "H2S__mg_L_1__", 0.001),
    entry(WaterParameter::PlanktonCount, "Plankton__No__L_1_", 5000.0),
];

/// Slot index of a parameter, or `None` if the classifier does not use it
pub fn slot_of(parameter: WaterParameter) -> Option<usize> {
    FEATURE_CATALOG.iter().position(|e| e.parameter == parameter)
}

/// Model column names in slot order
pub fn model_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_CATALOG.iter().map(|e| e.model_column)
}
