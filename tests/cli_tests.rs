use std::fs;
use std::process::Command;

fn timetabler() -> Command {
    Command::new(env!("CARGO_BIN_EXE_timetabler"))
}

#[test]
fn explain_prints_every_constraint() {
    let output = timetabler()
        .args(["explain", "--demo", "small", "--quiet"])
        .output()
        .expect("Failed to execute binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in [
        "roomConflict",
        "teacherConflict",
        "studentGroupConflict",
        "teacherRoomStability",
        "teacherTimeEfficiency",
        "studentGroupSubjectVariety",
    ] {
        assert!(stdout.contains(name), "missing {} in:\n{}", name, stdout);
    }
    assert!(stdout.contains("19 lessons are unassigned"));
}

#[test]
fn solve_writes_csv_and_json() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let csv_path = dir.path().join("best.csv");
    let json_path = dir.path().join("best.json");

    let output = timetabler()
        .args(["solve", "--demo", "small", "--seed", "3", "--max-steps", "2000"])
        .arg("--output")
        .arg(&csv_path)
        .arg("--json")
        .arg(&json_path)
        .output()
        .expect("Failed to execute binary");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let csv = fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("lesson_id,subject,teacher,student_group,day,start,end,room,pinned")
    );
    assert_eq!(lines.count(), 20);

    let tt = timetabler::domain::Timetable::load_from_file(&json_path).unwrap();
    assert_eq!(tt.unassigned_count(), 0);
}

#[test]
fn config_file_is_applied_and_flags_win() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("solver.json");
    fs::write(&config, r#"{ "max_steps": 10, "cooling_rate": 5.0 }"#).unwrap();

    // cooling_rate from the file is invalid and must surface as an error.
    let output = timetabler()
        .arg("solve")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert!(!output.status.success());

    // An explicit flag repairs it.
    let output = timetabler()
        .arg("solve")
        .arg("--config")
        .arg(&config)
        .args(["--cooling-rate", "0.99"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn missing_problem_file_fails() {
    let output = timetabler()
        .args(["solve", "--problem", "/definitely/not/here.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}
