//! End-to-end analysis scenarios against the orchestrator
//!
//! Validation is scripted; the classifier is either a constant forest or
//! absent.

mod helpers;

use aquasense_ai::classifier::{Capabilities, InferencePool, ModelCapability};
use aquasense_ai::fusion::{FusionPolicy, ValidationState};
use aquasense_ai::orchestrator::TankAnalysisRequest;
use aquasense_ai::types::{HealthStatus, QualityLabel};
use aquasense_ai::validation::GenerationError;
use aquasense_ai::AnalysisError;
use aquasense_common::{MeasuredReading, WaterParameter};
use helpers::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn request() -> TankAnalysisRequest {
    TankAnalysisRequest {
        tank_id: TANK_ID.to_string(),
        species: vec!["Nile tilapia".to_string()],
        session_id: None,
    }
}

const AGREEING_REPLY: &str = "STATUS: good\nHEALTH_SCORE: 76\n\
    SUMMARY: Parameters are within the comfortable range for tilapia.\n\
    WARNINGS:\n- none\n\
    RECOMMENDATIONS:\n- Keep weekly ammonia checks\n- Maintain aeration";

#[tokio::test]
async fn scenario_a_agreeing_signals() {
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(analysis.status, HealthStatus::Good);
    assert!((65..=80).contains(&analysis.health_score));
    assert!(analysis.ml_enabled);
    assert_eq!(analysis.validation, ValidationState::Complete);
    assert_eq!(analysis.recommendations.len(), 2);
    assert!(analysis.warnings.is_empty());

    let prediction = analysis.ml_prediction.unwrap();
    assert_eq!(prediction.label, QualityLabel::Good);
    assert!((prediction.confidence - 0.85).abs() < 1e-9);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn scenario_b_validation_escalates_to_critical() {
    let reading = healthy_reading().with(WaterParameter::Ammonia, 1.5);
    let reply = "STATUS: good\nHEALTH_SCORE: 70\n\
        SUMMARY: Ammonia has reached a dangerous level.\n\
        WARNINGS:\n- CRITICAL: Ammonia at 1.5 mg/L is acutely toxic\n- critical: ammonia at 1.5 mg/L is acutely toxic\n\
        RECOMMENDATIONS:\n- Perform a 50% water change immediately";
    let generator = Arc::new(ScriptedGenerator::replying(reply));
    let engine = orchestrator(good_classifier(), tank_with(reading).await, generator, fast_settings());

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(analysis.ml_prediction.as_ref().unwrap().label, QualityLabel::Good);
    assert_eq!(analysis.status, HealthStatus::Critical);
    assert_eq!(analysis.health_score, 70);
    let ammonia_warnings = analysis
        .warnings
        .iter()
        .filter(|w| w.to_lowercase().contains("ammonia"))
        .count();
    assert_eq!(ammonia_warnings, 1);
}

#[tokio::test]
async fn scenario_c_classifier_absent_uses_validation_only() {
    let reply = "STATUS: needs_attention\nHEALTH_SCORE: 58\nSUMMARY: Dissolved oxygen is marginal.";
    let generator = Arc::new(ScriptedGenerator::replying(reply));
    let engine = orchestrator(
        Capabilities::disabled(),
        tank_with(healthy_reading()).await,
        generator,
        fast_settings(),
    );

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert!(!analysis.ml_enabled);
    assert!(analysis.ml_prediction.is_none());
    assert_eq!(analysis.health_score, 58);
    assert_eq!(analysis.status, HealthStatus::NeedsAttention);
    assert_eq!(analysis.narrative, "Dissolved oxygen is marginal.");
}

#[tokio::test]
async fn scenario_d_validation_times_out_on_every_attempt() {
    let generator = Arc::new(
        ScriptedGenerator::failing_with(|| Ok("STATUS: critical".to_string()))
            .with_delay(Duration::from_millis(500)),
    );
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(generator.calls(), 3);
    assert_eq!(analysis.validation, ValidationState::Unavailable);
    assert_eq!(analysis.status, HealthStatus::Good);
    let prediction = analysis.ml_prediction.as_ref().unwrap();
    assert_eq!(analysis.health_score, FusionPolicy::default().classifier_score(prediction));
    assert!((65..=80).contains(&analysis.health_score));
    assert!(analysis.ml_enabled);
    assert!(analysis.narrative.contains("unavailable"));
}

#[tokio::test]
async fn scenario_e_no_signals_is_unavailable() {
    let generator = Arc::new(ScriptedGenerator::failing_with(|| {
        Err(GenerationError::Status {
            status: 503,
            message: "overloaded".into(),
        })
    }));
    let engine = orchestrator(
        Capabilities::disabled(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );

    let err = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, AnalysisError::AnalysisUnavailable { .. }));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test]
async fn test_unconfigured_validator_without_classifier_is_unavailable() {
    let generator = Arc::new(ScriptedGenerator::unconfigured());
    let engine = orchestrator(
        Capabilities::disabled(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );

    let err = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap_err();

    match err {
        AnalysisError::AnalysisUnavailable { reason } => assert!(reason.contains("not configured")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_validation_never_softens_classifier() {
    let reply = "STATUS: excellent\nHEALTH_SCORE: 95\nSUMMARY: Looks pristine.";
    let generator = Arc::new(ScriptedGenerator::replying(reply));
    let engine = orchestrator(
        with_forest(constant_forest(5.0, 15.0, 80.0)),
        tank_with(healthy_reading()).await,
        generator,
        fast_settings(),
    );

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(analysis.status, HealthStatus::NeedsAttention);
    assert_eq!(analysis.health_score, 95);
    assert!(analysis.warnings.iter().any(|w| w.contains("Poor")));
}

#[tokio::test]
async fn test_degraded_reply_is_kept_as_narrative() {
    let reply = "Honestly the water seems fine to me, nothing stands out.";
    let generator = Arc::new(ScriptedGenerator::replying(reply));
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator,
        fast_settings(),
    );

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(analysis.validation, ValidationState::Degraded);
    assert_eq!(analysis.narrative, reply);
    assert_eq!(analysis.status, HealthStatus::Good);
    let prediction = analysis.ml_prediction.as_ref().unwrap();
    assert_eq!(analysis.health_score, FusionPolicy::default().classifier_score(prediction));
}

#[tokio::test]
async fn test_deadline_bounds_the_request() {
    let generator = Arc::new(
        ScriptedGenerator::failing_with(|| Ok("STATUS: good".to_string())).with_delay(Duration::from_secs(5)),
    );
    let settings = aquasense_ai::config::AnalysisSettings {
        deadline_ms: 150,
        attempt_timeout_ms: 10_000,
        ..fast_settings()
    };
    let engine = orchestrator(good_classifier(), tank_with(healthy_reading()).await, generator, settings);

    let started = Instant::now();
    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(analysis.validation, ValidationState::Unavailable);
    assert!(analysis.ml_enabled);
}

#[tokio::test]
async fn test_cancelled_request_returns_cancelled() {
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY).with_delay(Duration::from_secs(5)));
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator,
        fast_settings(),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = engine.analyze_tank(request(), cancel).await.unwrap_err();

    assert_eq!(err, AnalysisError::Cancelled);
}

#[tokio::test]
async fn test_out_of_range_value_is_field_error() {
    let reading = healthy_reading().with(WaterParameter::Ph, 15.2);
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let engine = orchestrator(good_classifier(), tank_with(reading).await, generator.clone(), fast_settings());

    let err = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap_err();

    match err {
        AnalysisError::InputValidation { field, .. } => assert_eq!(field, "ph"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_unknown_tank_and_empty_tank() {
    let tanks = tank_with(healthy_reading()).await;
    tanks.add_tank("empty", "Quarantine", &[]).await;
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let engine = orchestrator(good_classifier(), tanks, generator, fast_settings());

    let unknown = TankAnalysisRequest {
        tank_id: "nope".into(),
        ..request()
    };
    assert_eq!(
        engine.analyze_tank(unknown, CancellationToken::new()).await.unwrap_err(),
        AnalysisError::TankNotFound("nope".into())
    );

    let empty = TankAnalysisRequest {
        tank_id: "empty".into(),
        ..request()
    };
    match engine.analyze_tank(empty, CancellationToken::new()).await.unwrap_err() {
        AnalysisError::InputValidation { field, .. } => assert_eq!(field, "tankId"),
        other => panic!("unexpected {:?}", other),
    }

    let blank = TankAnalysisRequest {
        tank_id: "  ".into(),
        ..request()
    };
    assert!(matches!(
        engine.analyze_tank(blank, CancellationToken::new()).await,
        Err(AnalysisError::InputValidation { .. })
    ));
}

#[tokio::test]
async fn test_sparse_reading_still_classified() {
    let reading = MeasuredReading::new(TANK_ID).with(WaterParameter::Ph, 7.1);
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let engine = orchestrator(good_classifier(), tank_with(reading).await, generator.clone(), fast_settings());

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert!(analysis.ml_enabled);
    let prompt = &generator.prompts()[0];
    assert!(prompt.contains("pH"));
}

#[tokio::test]
async fn test_session_context_reaches_next_prompt() {
    let generator = Arc::new(ScriptedGenerator::always_replying(AGREEING_REPLY));
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );
    let with_session = || TankAnalysisRequest {
        session_id: Some("s-1".into()),
        ..request()
    };

    engine.analyze_tank(with_session(), CancellationToken::new()).await.unwrap();
    engine.analyze_tank(with_session(), CancellationToken::new()).await.unwrap();

    let prompts = generator.prompts();
    assert!(!prompts[0].contains("RECENT CONVERSATION"));
    assert!(prompts[1].contains("RECENT CONVERSATION"));
    assert!(prompts[1].contains("Tank tank-1: good"));
    assert_eq!(engine.sessions().recent("s-1", 10).await.len(), 4);
}

#[tokio::test]
async fn test_species_fall_back_to_tank_profile() {
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let engine = orchestrator(
        good_classifier(),
        tank_with(healthy_reading()).await,
        generator.clone(),
        fast_settings(),
    );
    let no_species = TankAnalysisRequest {
        species: Vec::new(),
        ..request()
    };

    engine.analyze_tank(no_species, CancellationToken::new()).await.unwrap();

    assert!(generator.prompts()[0].contains("Nile tilapia"));
}

#[tokio::test]
async fn test_bundled_forest_classifies_readings() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("models/water_quality_forest.json");
    let forest = aquasense_ai::classifier::RandomForest::load(&path).unwrap();
    let healthy = aquasense_ai::features::FeatureVector::build(&healthy_reading());
    let polluted = aquasense_ai::features::FeatureVector::build(
        &healthy_reading()
            .with(WaterParameter::Ammonia, 2.0)
            .with(WaterParameter::Nitrite, 0.5)
            .with(WaterParameter::Ph, 6.0),
    );

    let first = forest.predict(&healthy).unwrap();
    assert_eq!(first, forest.predict(&healthy).unwrap());
    assert_eq!(first.label, QualityLabel::Good);
    assert_eq!(forest.predict(&polluted).unwrap().label, QualityLabel::Poor);
}

#[tokio::test]
async fn test_stalled_tank_data_is_bounded_by_deadline() {
    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY));
    let settings = aquasense_ai::config::AnalysisSettings {
        deadline_ms: 200,
        ..fast_settings()
    };
    let engine = orchestrator(good_classifier(), Arc::new(StalledTankData), generator.clone(), settings);

    let err = tokio::time::timeout(Duration::from_secs(2), engine.analyze_tank(request(), CancellationToken::new()))
        .await
        .expect("analysis must finish at its own deadline")
        .unwrap_err();

    match err {
        AnalysisError::AnalysisUnavailable { reason } => assert!(reason.contains("deadline")),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn test_cancel_during_tank_lookup_returns_cancelled() {
    let engine = orchestrator(
        good_classifier(),
        Arc::new(StalledTankData),
        Arc::new(ScriptedGenerator::replying(AGREEING_REPLY)),
        fast_settings(),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(2), engine.analyze_tank(request(), cancel))
        .await
        .expect("cancellation must end the request")
        .unwrap_err();
    assert_eq!(err, AnalysisError::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_busy_inference_pool_does_not_outlast_deadline() {
    // One worker, held by an unrelated job for longer than the deadline
    let pool = InferencePool::new(1);
    let capabilities = Capabilities::new(
        ModelCapability::ready(constant_forest(10.0, 85.0, 5.0)),
        ModelCapability::absent(),
        pool.clone(),
    );
    let busy = pool.clone();
    let blocker = tokio::spawn(async move {
        busy.run(|| {
            std::thread::sleep(Duration::from_millis(1500));
            Ok(())
        })
        .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let generator = Arc::new(ScriptedGenerator::replying(AGREEING_REPLY).with_delay(Duration::from_secs(5)));
    let settings = aquasense_ai::config::AnalysisSettings {
        deadline_ms: 300,
        ..fast_settings()
    };
    let engine = orchestrator(capabilities, tank_with(healthy_reading()).await, generator, settings);

    let started = Instant::now();
    let result = engine.analyze_tank(request(), CancellationToken::new()).await;

    assert!(started.elapsed() < Duration::from_millis(1200));
    // Neither signal finished in time
    assert!(matches!(result, Err(AnalysisError::AnalysisUnavailable { .. })));
    blocker.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_negated_critical_warning_does_not_escalate() {
    let reply = "STATUS: good\nHEALTH_SCORE: 78\n\
        SUMMARY: Parameters are stable for tilapia.\n\
        WARNINGS:\n- No critical issues detected\n- Ammonia is not at a lethal level\n\
        RECOMMENDATIONS:\n- Keep testing weekly";
    let generator = Arc::new(ScriptedGenerator::replying(reply));
    let engine = orchestrator(good_classifier(), tank_with(healthy_reading()).await, generator, fast_settings());

    let analysis = engine.analyze_tank(request(), CancellationToken::new()).await.unwrap();

    assert_eq!(analysis.status, HealthStatus::Good);
    assert_eq!(analysis.health_score, 78);
}
