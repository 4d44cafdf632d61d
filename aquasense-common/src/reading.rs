//! Water-quality parameters and sparse measured readings
//!
//! A [`MeasuredReading`] holds whatever subset of parameters a tank actually
//! reported. Nothing here fills gaps; substitution of defaults happens only in
//! the analysis service's feature vector builder, which records provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Every water-quality parameter known to AquaSense
///
/// The first eight are tracked per tank by telemetry. The remaining eight are
/// laboratory parameters, usually absent from tank readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaterParameter {
    Temperature,
    Ph,
    DissolvedOxygen,
    Turbidity,
    Ammonia,
    Nitrite,
    Nitrate,
    Salinity,
    Bod,
    Co2,
    Alkalinity,
    Hardness,
    Calcium,
    Phosphorus,
    H2s,
    PlanktonCount,
}

impl WaterParameter {
    /// All parameters in declaration order
    pub const ALL: [WaterParameter; 16] = [
        WaterParameter::Temperature,
        WaterParameter::Ph,
        WaterParameter::DissolvedOxygen,
        WaterParameter::Turbidity,
        WaterParameter::Ammonia,
        WaterParameter::Nitrite,
        WaterParameter::Nitrate,
        WaterParameter::Salinity,
        WaterParameter::Bod,
        WaterParameter::Co2,
        WaterParameter::Alkalinity,
        WaterParameter::Hardness,
        WaterParameter::Calcium,
        WaterParameter::Phosphorus,
        WaterParameter::H2s,
        WaterParameter::PlanktonCount,
    ];

    /// Wire name (matches the serde representation)
    pub fn key(self) -> &'static str {
        match self {
            WaterParameter::Temperature => "temperature",
            WaterParameter::Ph => "ph",
            WaterParameter::DissolvedOxygen => "dissolvedOxygen",
            WaterParameter::Turbidity => "turbidity",
            WaterParameter::Ammonia => "ammonia",
            WaterParameter::Nitrite => "nitrite",
            WaterParameter::Nitrate => "nitrate",
            WaterParameter::Salinity => "salinity",
            WaterParameter::Bod => "bod",
            WaterParameter::Co2 => "co2",
            WaterParameter::Alkalinity => "alkalinity",
            WaterParameter::Hardness => "hardness",
            WaterParameter::Calcium => "calcium",
            WaterParameter::Phosphorus => "phosphorus",
            WaterParameter::H2s => "h2s",
            WaterParameter::PlanktonCount => "planktonCount",
        }
    }

    /// Human-readable name used in prompts and logs
    pub fn display_name(self) -> &'static str {
        match self {
            WaterParameter::Temperature => "Temperature",
            WaterParameter::Ph => "pH",
            WaterParameter::DissolvedOxygen => "Dissolved oxygen",
            WaterParameter::Turbidity => "Turbidity",
            WaterParameter::Ammonia => "Ammonia",
            WaterParameter::Nitrite => "Nitrite",
            WaterParameter::Nitrate => "Nitrate",
            WaterParameter::Salinity => "Salinity",
            WaterParameter::Bod => "BOD",
            WaterParameter::Co2 => "CO2",
            WaterParameter::Alkalinity => "Alkalinity",
            WaterParameter::Hardness => "Hardness",
            WaterParameter::Calcium => "Calcium",
            WaterParameter::Phosphorus => "Phosphorus",
            WaterParameter::H2s => "H2S",
            WaterParameter::PlanktonCount => "Plankton count",
        }
    }

    /// Physical unit ("" for dimensionless pH)
    pub fn unit(self) -> &'static str {
        match self {
            WaterParameter::Temperature => "°C",
            WaterParameter::Ph => "",
            WaterParameter::Turbidity => "cm",
            WaterParameter::Salinity => "ppt",
            WaterParameter::PlanktonCount => "No/L",
            _ => "mg/L",
        }
    }

    /// Physically sane inclusive range; values outside are rejected as input errors
    pub fn sane_range(self) -> (f64, f64) {
        match self {
            WaterParameter::Temperature => (-5.0, 50.0),
            WaterParameter::Ph => (0.0, 14.0),
            WaterParameter::DissolvedOxygen => (0.0, 30.0),
            WaterParameter::Turbidity => (0.0, 1000.0),
            WaterParameter::Ammonia => (0.0, 100.0),
            WaterParameter::Nitrite => (0.0, 100.0),
            WaterParameter::Nitrate => (0.0, 1000.0),
            WaterParameter::Salinity => (0.0, 50.0),
            WaterParameter::Bod => (0.0, 100.0),
            WaterParameter::Co2 => (0.0, 200.0),
            WaterParameter::Alkalinity => (0.0, 1000.0),
            WaterParameter::Hardness => (0.0, 2000.0),
            WaterParameter::Calcium => (0.0, 1000.0),
            WaterParameter::Phosphorus => (0.0, 100.0),
            WaterParameter::H2s => (0.0, 50.0),
            WaterParameter::PlanktonCount => (0.0, 1.0e9),
        }
    }

    /// Look up a parameter by its wire name
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

impl fmt::Display for WaterParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A measured value outside its parameter's sane range
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsViolation {
    pub parameter: WaterParameter,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl BoundsViolation {
    /// Field name as the caller sent it
    pub fn field(&self) -> &'static str {
        self.parameter.key()
    }
}

impl fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_finite() {
            write!(
                f,
                "{} value {} is outside the sane range [{}, {}]",
                self.parameter, self.value, self.min, self.max
            )
        } else {
            write!(f, "{} value is not a finite number", self.parameter)
        }
    }
}

/// Sparse record of the parameters a tank reported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredReading {
    #[serde(default)]
    pub tank_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub values: BTreeMap<WaterParameter, f64>,
}

impl MeasuredReading {
    pub fn new(tank_id: impl Into<String>) -> Self {
        Self {
            tank_id: tank_id.into(),
            recorded_at: None,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, parameter: WaterParameter, value: f64) -> Self {
        self.values.insert(parameter, value);
        self
    }

    pub fn get(&self, parameter: WaterParameter) -> Option<f64> {
        self.values.get(&parameter).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Present parameters in stable order
    pub fn parameters(&self) -> impl Iterator<Item = WaterParameter> + '_ {
        self.values.keys().copied()
    }

    /// Reject non-finite values and values outside sane physical bounds
    ///
    /// Returns the first violation in parameter order.
    pub fn validate_bounds(&self) -> std::result::Result<(), BoundsViolation> {
        for (&parameter, &value) in &self.values {
            let (min, max) = parameter.sane_range();
            if !value.is_finite() || value < min || value > max {
                return Err(BoundsViolation {
                    parameter,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}
