//! Tank data access
//!
//! Analysis reads the latest sensor reading (and the stocked species) for a
//! tank. Tanks and readings are written elsewhere; this service only reads.

use aquasense_common::{MeasuredReading, WaterParameter};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum TankDataError {
    #[error("Tank not found: {0}")]
    TankNotFound(String),

    #[error("Tank {0} has no water quality readings")]
    NoReadings(String),

    #[error("Tank data unavailable: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for TankDataError {
    fn from(e: sqlx::Error) -> Self {
        TankDataError::Backend(e.to_string())
    }
}

/// Tank metadata relevant to analysis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TankProfile {
    pub id: String,
    pub name: String,
    pub species: Vec<String>,
}

#[async_trait]
pub trait TankDataSource: Send + Sync {
    async fn tank(&self, tank_id: &str) -> Result<TankProfile, TankDataError>;

    /// Most recent reading; `NoReadings` when the tank exists but has none
    async fn latest_reading(&self, tank_id: &str) -> Result<MeasuredReading, TankDataError>;
}

/// Columns of `water_quality_readings` and the parameter each holds
const READING_COLUMNS: [(&str, WaterParameter); 8] = [
    ("ph", WaterParameter::Ph),
    ("temperature", WaterParameter::Temperature),
    ("dissolved_oxygen", WaterParameter::DissolvedOxygen),
    ("ammonia", WaterParameter::Ammonia),
    ("nitrite", WaterParameter::Nitrite),
    ("nitrate", WaterParameter::Nitrate),
    ("salinity", WaterParameter::Salinity),
    ("turbidity", WaterParameter::Turbidity),
];

/// SQLite-backed source over the `tanks` and `water_quality_readings` tables
#[derive(Debug, Clone)]
pub struct SqliteTankData {
    pool: SqlitePool,
}

impl SqliteTankData {
    /// Open an existing database read-only
    pub async fn connect(path: &Path) -> aquasense_common::Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .read_only(true)
            .create_if_missing(false);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        tracing::info!(path = %path.display(), "Tank database opened");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TankDataSource for SqliteTankData {
    async fn tank(&self, tank_id: &str) -> Result<TankProfile, TankDataError> {
        let row = sqlx::query("SELECT id, name, species FROM tanks WHERE id = ?")
            .bind(tank_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| TankDataError::TankNotFound(tank_id.to_string()))?;

        let species_json: Option<String> = row.try_get("species")?;
        let species = species_json
            .as_deref()
            .map(parse_species)
            .unwrap_or_default();

        Ok(TankProfile {
            id: row.try_get("id")?,
            name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
            species,
        })
    }

    async fn latest_reading(&self, tank_id: &str) -> Result<MeasuredReading, TankDataError> {
        // Distinguish "unknown tank" from "tank without readings"
        self.tank(tank_id).await?;

        let row = sqlx::query(
            "SELECT ph, temperature, dissolved_oxygen, ammonia, nitrite, nitrate, salinity, turbidity, created_at \
             FROM water_quality_readings WHERE tank_id = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(tank_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| TankDataError::NoReadings(tank_id.to_string()))?;

        let mut reading = MeasuredReading::new(tank_id);
        for (column, parameter) in READING_COLUMNS {
            if let Some(value) = row.try_get::<Option<f64>, _>(column)? {
                reading.values.insert(parameter, value);
            }
        }
        reading.recorded_at = row
            .try_get::<Option<String>, _>("created_at")?
            .as_deref()
            .and_then(parse_timestamp);

        Ok(reading)
    }
}

/// Species column holds a JSON list; a bare string is taken as one species
fn parse_species(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// In-process source for tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryTankData {
    tanks: RwLock<HashMap<String, (TankProfile, Vec<MeasuredReading>)>>,
}

impl InMemoryTankData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tank(&self, id: &str, name: &str, species: &[&str]) {
        let profile = TankProfile {
            id: id.to_string(),
            name: name.to_string(),
            species: species.iter().map(|s| s.to_string()).collect(),
        };
        self.tanks.write().await.insert(id.to_string(), (profile, Vec::new()));
    }

    /// Append a reading; the last one added is the latest
    pub async fn add_reading(&self, mut reading: MeasuredReading) -> Result<(), TankDataError> {
        let mut tanks = self.tanks.write().await;
        let (_, readings) = tanks
            .get_mut(&reading.tank_id)
            .ok_or_else(|| TankDataError::TankNotFound(reading.tank_id.clone()))?;
        reading.recorded_at.get_or_insert_with(Utc::now);
        readings.push(reading);
        Ok(())
    }
}

#[async_trait]
impl TankDataSource for InMemoryTankData {
    async fn tank(&self, tank_id: &str) -> Result<TankProfile, TankDataError> {
        self.tanks
            .read()
            .await
            .get(tank_id)
            .map(|(profile, _)| profile.clone())
            .ok_or_else(|| TankDataError::TankNotFound(tank_id.to_string()))
    }

    async fn latest_reading(&self, tank_id: &str) -> Result<MeasuredReading, TankDataError> {
        let tanks = self.tanks.read().await;
        let (_, readings) = tanks
            .get(tank_id)
            .ok_or_else(|| TankDataError::TankNotFound(tank_id.to_string()))?;
        readings
            .last()
            .cloned()
            .ok_or_else(|| TankDataError::NoReadings(tank_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_species_variants() {
        assert_eq!(parse_species(r#"["Tilapia","Catfish"]"#), vec!["Tilapia", "Catfish"]);
        assert_eq!(parse_species("Tilapia"), vec!["Tilapia"]);
        assert!(parse_species("  ").is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01 12:30:00.123456").is_some());
        assert!(parse_timestamp("2024-05-01T12:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:30:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[tokio::test]
    async fn test_in_memory_latest_reading() {
        let data = InMemoryTankData::new();
        data.add_tank("t1", "Pond 1", &["Tilapia"]).await;

        assert!(matches!(
            data.latest_reading("t1").await,
            Err(TankDataError::NoReadings(_))
        ));

        data.add_reading(MeasuredReading::new("t1").with(WaterParameter::Ph, 7.0))
            .await
            .unwrap();
        data.add_reading(MeasuredReading::new("t1").with(WaterParameter::Ph, 7.4))
            .await
            .unwrap();

        let latest = data.latest_reading("t1").await.unwrap();
        assert_eq!(latest.get(WaterParameter::Ph), Some(7.4));
        assert!(latest.recorded_at.is_some());
    }

    #[tokio::test]
    async fn test_in_memory_unknown_tank() {
        let data = InMemoryTankData::new();
        assert!(matches!(
            data.latest_reading("nope").await,
            Err(TankDataError::TankNotFound(_))
        ));
        assert!(data
            .add_reading(MeasuredReading::new("nope"))
            .await
            .is_err());
    }
}
