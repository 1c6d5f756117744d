use std::fs;
use timetabler::config::{SelectionMode, SolverConfig};
use timetabler::demo::{self, DemoData};
use timetabler::domain::Timetable;
use timetabler::error::TimetableError;

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("solver.json");
    fs::write(
        &path,
        r#"{ "seed": 11, "selection": "ordered", "time_limit_ms": 1500, "cooling_rate": 0.999 }"#,
    )
    .unwrap();

    let config = SolverConfig::load_from_file(&path).unwrap();
    assert_eq!(config.seed, Some(11));
    assert_eq!(config.selection, SelectionMode::Ordered);
    assert_eq!(config.time_limit().map(|d| d.as_millis()), Some(1500));
    assert_eq!(config.cooling_rate, 0.999);
    assert_eq!(config.temp_start, SolverConfig::default().temp_start);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "temp_start": 0.0 }"#).unwrap();
    assert!(matches!(
        SolverConfig::load_from_file(&path),
        Err(TimetableError::Config(_))
    ));

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        SolverConfig::load_from_file(&path),
        Err(TimetableError::Json(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SolverConfig::load_from_file(dir.path().join("nope.json")),
        Err(TimetableError::Io(_))
    ));
}

#[test]
fn problem_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problem.json");
    let tt = demo::generate(DemoData::Small, 3).unwrap();
    fs::write(&path, serde_json::to_string_pretty(&tt).unwrap()).unwrap();

    let loaded = Timetable::load_from_file(&path).unwrap();
    assert_eq!(loaded, tt);
}

#[test]
fn problem_file_with_duplicate_ids_is_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dupes.json");
    let tt = demo::generate(DemoData::Small, 1).unwrap();
    let json = serde_json::to_string(&tt)
        .unwrap()
        .replace("\"id\":10001,", "\"id\":10000,");
    fs::write(&path, json).unwrap();

    let err = Timetable::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("duplicate lesson identity"), "{}", err);
}
