//! End-to-end classification tests driven by the shared JSON fixtures

use hfwatch_core::config;
use hfwatch_core::scenarios::{self, Checkin};
use hfwatch_core::{
    classify, Category, ClassifyError, Engine, History, Preset, SymptomSet,
};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> Value {
    let path = fixture_path(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("fixture should be valid JSON")
}

#[test]
fn test_classify_fixture_cases() {
    let cases = read_fixture("classify_cases.json");
    let cases = cases.as_array().expect("fixture is an array");
    assert!(!cases.is_empty());

    for case in cases {
        let name = case["name"].as_str().unwrap();
        let result = classify(&case["input"], &case["baseline"], &case["history"])
            .unwrap_or_else(|e| panic!("{}: unexpected error: {}", name, e));
        let actual = serde_json::to_value(&result).unwrap();

        for (key, expected) in case["expect"].as_object().unwrap() {
            let got = match key.as_str() {
                "category" | "proposed_category" | "normalized_score" => &actual[key],
                _ => &actual["flags"][key],
            };
            assert_eq!(got, expected, "{}: {} mismatch", name, key);
        }

        assert!(
            (0.0..=10.0).contains(&result.normalized_score),
            "{}: score out of range",
            name
        );
        assert!(!result.summary.is_empty(), "{}: empty summary", name);
    }
}

#[test]
fn test_documented_example_sequence() {
    let baseline = json!({"sob": 0, "edema": 0, "fatigue": 0});
    let engine = Engine::default();

    let calm = engine
        .classify_value(&json!({"sob": 0, "edema": 0, "fatigue": 0}), &baseline, &Value::Null, false)
        .unwrap();
    assert_eq!(calm.category, Category::Green);
    assert!(calm.normalized_score < 0.01);

    let acute = engine
        .classify_value(
            &json!({"sob": 3, "edema": 2, "fatigue": 1, "orthopnea": true}),
            &baseline,
            &Value::Null,
            false,
        )
        .unwrap();
    assert!(acute.category.rank() >= Category::Orange.rank());
    assert!(acute.flags.escalation_applied);
    assert!((acute.weighted_symptom_pressure - 6.6).abs() < 1e-9);
    assert_eq!(acute.engine_version, "3.9e-FINAL-CL");
}

#[test]
fn test_replay_fixture_series() {
    let series = read_fixture("replay_series.json");
    let baseline = SymptomSet::baseline_from_value(&series["baseline"]).unwrap();
    let checkins: Vec<Checkin> = series["checkins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| Checkin::from_value(v).unwrap())
        .collect();

    let replay = scenarios::replay(&Engine::default(), &baseline, &checkins, false).unwrap();
    let categories: Vec<Category> = replay.days.iter().map(|d| d.result.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::Green,
            Category::Red,
            Category::Yellow,
            Category::Neutral
        ]
    );
    assert!(replay.days[1].result.flags.escalation_applied);
    assert!(replay.days[2].result.flags.hysteresis_clamp.is_some());
    assert!(!replay.days[3].recorded);
    assert_eq!(replay.days[0].label.as_deref(), Some("2025-10-01"));

    assert_eq!(replay.history.len(), 3);
    replay.history.validate().unwrap();
    assert_eq!(
        replay.history.categories,
        vec![Category::Green, Category::Red, Category::Yellow]
    );
}

#[test]
fn test_scenario_pack_fixture() {
    let pack = scenarios::load_pack(&fixture_path("scenario_pack.json")).unwrap();
    assert_eq!(pack.len(), 7);

    let report = scenarios::run_pack(&Engine::default(), &pack).unwrap();
    let s = &report.summary;
    assert_eq!(s.total, 7);
    assert_eq!(s.incomplete, 1);
    assert_eq!(s.alerts, 3);
    assert_eq!(s.true_positives, 3);
    assert_eq!(s.false_negatives, 1);
    assert_eq!(s.true_negatives, 2);
    assert_eq!(s.false_positives, 0);
    assert_eq!(s.sensitivity, Some(0.75));
    assert_eq!(s.specificity, Some(1.0));
    assert_eq!(s.by_category.get("Green"), Some(&3));
    assert_eq!(s.by_category.get("Neutral"), Some(&1));

    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted, "outcomes must be sorted by id");
}

#[test]
fn test_scenario_pack_is_deterministic() {
    let pack = scenarios::load_pack(&fixture_path("scenario_pack.json")).unwrap();
    let engine = Engine::default();
    let first = scenarios::run_pack(&engine, &pack).unwrap();
    let second = scenarios::run_pack(&engine, &pack).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_structural_history_errors() {
    let input = json!({"sob": 1, "edema": 0, "fatigue": 0});
    let baseline = json!({"sob": 0, "edema": 0, "fatigue": 0});

    let mismatched = json!({
        "categories": ["Green", "Green"],
        "normalizedScores": [0.0],
        "weightedSymptomPressures": [0.0, 0.0]
    });
    assert!(matches!(
        classify(&input, &baseline, &mismatched),
        Err(ClassifyError::HistoryLengthMismatch { .. })
    ));

    let wrong_type = json!({"categories": ["Purple"]});
    assert!(matches!(
        classify(&input, &baseline, &wrong_type),
        Err(ClassifyError::InvalidHistory(_))
    ));

    assert!(matches!(
        classify(&json!([1, 2, 3]), &baseline, &Value::Null),
        Err(ClassifyError::NotAnObject { .. })
    ));
}

#[test]
fn test_history_push_feeds_next_call() {
    let engine = Engine::default();
    let baseline =
        SymptomSet::baseline_from_value(&json!({"sob": 0, "edema": 0, "fatigue": 0})).unwrap();
    let mut history = History::new();

    let orange_day = SymptomSet::from_value(&json!({"sob": 2, "edema": 2, "fatigue": 0})).unwrap();
    let first = engine.classify(&orange_day, &baseline, &history, false).unwrap();
    assert!(first.category.is_elevated());
    history.push(&first);

    let calm = SymptomSet::from_value(&json!({"sob": 0, "edema": 0, "fatigue": 0})).unwrap();
    let second = engine.classify(&calm, &baseline, &history, false).unwrap();
    assert!(!second.flags.escalation_applied);
    assert_ne!(second.category, Category::Green);
}

#[test]
fn test_config_file_selects_preset() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("hfwatch.config.json"),
        r#"{"preset": "3.8-B1", "hysteresis": {"cool_down_days": 3}}"#,
    )
    .unwrap();

    let resolved = config::load_and_resolve(dir.path(), None, None).unwrap();
    assert_eq!(resolved.preset, Preset::V38B1);
    assert_eq!(resolved.engine.hysteresis.cool_down_days, 3);

    let engine = Engine::new(resolved.engine);
    let result = engine
        .classify_value(
            &json!({"sob": 0, "edema": 0, "fatigue": 0}),
            &json!({"sob": 0, "edema": 0, "fatigue": 0}),
            &Value::Null,
            false,
        )
        .unwrap();
    assert_eq!(result.engine_version, "3.8-B1");
}

#[test]
fn test_every_preset_classifies_the_acute_day() {
    let input = json!({"sob": 3, "edema": 3, "fatigue": 2, "orthopnea": true});
    let baseline = json!({"sob": 0, "edema": 0, "fatigue": 0});
    for preset in Preset::ALL {
        let result = Engine::from_preset(preset)
            .classify_value(&input, &baseline, &Value::Null, false)
            .unwrap();
        assert!(
            result.category.rank() >= Category::Orange.rank(),
            "{} classified the acute day as {}",
            preset,
            result.category
        );
        assert_eq!(result.engine_version, preset.tag());
    }
}

#[test]
fn test_baseline_record_prefers_baseline_alias() {
    let input = json!({"sob": 1, "edema": 1, "fatigue": 1});
    let baseline = json!({
        "sobLevel": 3, "baselineSob": 1,
        "edemaLevel": 3, "baselineEdema": 1,
        "fatigueLevel": 3, "baselineFatigue": 1
    });
    let result = classify(&input, &baseline, &Value::Null).unwrap();
    assert!(result.flags.noise_guard_active);
    assert_eq!(result.category, Category::Green);
    assert!(result.weighted_symptom_pressure.abs() < 1e-9);
}
