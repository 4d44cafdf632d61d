//! Shared fixtures for aquasense-ai integration tests
//!
//! Scripted text generators stand in for the Gemini backend; a constant
//! forest stands in for the trained water-quality classifier.

#![allow(dead_code)]

use aquasense_ai::classifier::{
    Capabilities, ForestArtifact, InferencePool, ModelCapability, RandomForest, TreeArrays,
};
use aquasense_ai::config::AnalysisSettings;
use aquasense_ai::fusion::FusionPolicy;
use aquasense_ai::orchestrator::AnalysisOrchestrator;
use aquasense_ai::tank_data::{InMemoryTankData, TankDataError, TankDataSource, TankProfile};
use aquasense_ai::validation::{GenerationError, RetryPolicy, TextGenerator, ValidationClient};
use aquasense_common::{MeasuredReading, WaterParameter};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TANK_ID: &str = "tank-1";

/// Replies with a fixed script, then repeats the fallback
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: fn() -> Result<String, GenerationError>,
    delay: Duration,
    configured: bool,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        let mut generator = Self::failing_with(|| Err(GenerationError::EmptyReply("script exhausted".into())));
        generator.script = Mutex::new(VecDeque::from(vec![Ok(reply.to_string())]));
        generator
    }

    pub fn always_replying(reply: &'static str) -> Self {
        let mut generator = Self::failing_with(|| Err(GenerationError::EmptyReply("unused".into())));
        generator.script = Mutex::new((0..16).map(|_| Ok(reply.to_string())).collect());
        generator
    }

    pub fn failing_with(fallback: fn() -> Result<String, GenerationError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            configured: true,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        let mut generator = Self::failing_with(|| Err(GenerationError::NotConfigured));
        generator.configured = false;
        generator
    }

    /// Every call sleeps before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(self.fallback)
    }
}

/// Forest whose every tree is a single leaf with the given class counts
pub fn constant_forest(excellent: f64, good: f64, poor: f64) -> RandomForest {
    let leaf = TreeArrays {
        children_left: vec![-1],
        children_right: vec![-1],
        feature: vec![-2],
        threshold: vec![-2.0],
        value: vec![vec![excellent, good, poor]],
    };
    let artifact = ForestArtifact {
        format: "aquasense-forest".to_string(),
        version: 1,
        feature_names: aquasense_ai::features::catalog::model_columns()
            .map(str::to_string)
            .collect(),
        classes: vec!["Excellent".into(), "Good".into(), "Poor".into()],
        trees: vec![leaf],
    };
    RandomForest::from_artifact(artifact).unwrap()
}

/// Classifier that always answers Good at 0.85
pub fn good_classifier() -> Capabilities {
    with_forest(constant_forest(10.0, 85.0, 5.0))
}

pub fn with_forest(forest: RandomForest) -> Capabilities {
    Capabilities::new(ModelCapability::ready(forest), ModelCapability::absent(), InferencePool::new(2))
}

/// Scenario A reading
pub fn healthy_reading() -> MeasuredReading {
    MeasuredReading::new(TANK_ID)
        .with(WaterParameter::Ph, 7.5)
        .with(WaterParameter::Temperature, 28.0)
        .with(WaterParameter::DissolvedOxygen, 6.5)
        .with(WaterParameter::Turbidity, 3.8)
        .with(WaterParameter::Ammonia, 0.015)
        .with(WaterParameter::Nitrite, 0.008)
}

pub async fn tank_with(reading: MeasuredReading) -> Arc<InMemoryTankData> {
    let tanks = Arc::new(InMemoryTankData::new());
    tanks.add_tank(TANK_ID, "Grow-out pond", &["Nile tilapia"]).await;
    tanks.add_reading(reading).await.unwrap();
    tanks
}

/// Fast retries so timeout scenarios finish quickly
pub fn fast_settings() -> AnalysisSettings {
    AnalysisSettings {
        deadline_ms: 5_000,
        attempt_timeout_ms: 50,
        max_retries: 2,
        backoff_base_ms: 10,
        ..Default::default()
    }
}

/// Tank store that answers the profile lookup but never returns a reading
pub struct StalledTankData;

#[async_trait]
impl TankDataSource for StalledTankData {
    async fn tank(&self, tank_id: &str) -> Result<TankProfile, TankDataError> {
        Ok(TankProfile {
            id: tank_id.to_string(),
            name: "Stalled pond".to_string(),
            species: vec!["Nile tilapia".to_string()],
        })
    }

    async fn latest_reading(&self, _tank_id: &str) -> Result<MeasuredReading, TankDataError> {
        std::future::pending().await
    }
}

pub fn orchestrator(
    capabilities: Capabilities,
    tanks: Arc<dyn TankDataSource>,
    generator: Arc<ScriptedGenerator>,
    settings: AnalysisSettings,
) -> AnalysisOrchestrator {
    let retry: RetryPolicy = settings.retry_policy();
    AnalysisOrchestrator::new(
        Arc::new(capabilities),
        tanks,
        ValidationClient::new(generator, retry),
        FusionPolicy::default(),
        settings,
    )
}
