use std::path::PathBuf;
use std::process::Command;

const EXE: &str = env!("CARGO_BIN_EXE_hikiluck");

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "hikiluck-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn data(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../data")
        .join(relative)
}

#[test]
fn cli_list_scenarios_writes_output() {
    let output_path = temp_path("list");
    let status = Command::new(EXE)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("smoke"));
}

#[test]
fn cli_lists_bundled_machines() {
    let output = Command::new(EXE)
        .arg("--list-machines")
        .arg("--machines-dir")
        .arg(data("machines"))
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Available machines (2)"));
    assert!(stdout.contains("juggler-a"));
}

#[test]
fn cli_evaluates_machine_file_to_json() {
    let output_path = temp_path("evaluate.json");
    let status = Command::new(EXE)
        .arg("--machine")
        .arg(data("machines/hokuto-at/hokuto-at.json"))
        .arg("--session")
        .arg(data("sessions/hokuto-lucky.json"))
        .args(["--report", "json", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let value: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(value["machine_id"], "hokuto-at");
    assert_eq!(value["outputs"]["poLuckDirection"], "up");
    assert_eq!(value["indicators"].as_array().map(Vec::len), Some(5));
}

#[test]
fn cli_evaluate_without_session_fails() {
    let output = Command::new(EXE)
        .args(["--machine-id", "juggler-a", "--machines-dir"])
        .arg(data("machines"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--session"));
}

#[test]
fn cli_runs_all_scenarios() {
    let output = Command::new(EXE)
        .args(["--mode", "scenarios", "--scenarios", "all", "--report", "csv"])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("scenario,passed,duration_ms,failures"));
    assert!(!stdout.contains(",false,"));
}

#[test]
fn cli_unknown_scenario_exits_with_failure() {
    let output = Command::new(EXE)
        .args(["--mode", "scenarios", "--scenarios", "no-such-scenario"])
        .output()
        .expect("run cli");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_calibrates_to_csv() {
    let output_path = temp_path("calibrate.csv");
    let status = Command::new(EXE)
        .args([
            "--mode",
            "calibrate",
            "--seeds",
            "1,2",
            "--iterations",
            "20",
            "--spins",
            "500",
            "--report",
            "csv",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("1,20,500,"));
    assert!(lines[2].starts_with("2,20,500,"));
}

#[test]
fn cli_evaluates_catalog_machine_with_settings_to_markdown() {
    let output_path = temp_path("evaluate.md");
    let status = Command::new(EXE)
        .args(["--machine-id", "juggler-a", "--machines-dir"])
        .arg(data("machines"))
        .arg("--session")
        .arg(data("sessions/juggler-evening.json"))
        .arg("--settings")
        .arg(data("settings/z-scheme.json"))
        .args(["--report", "markdown", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("- **Machine id**: juggler-a"));
    assert!(content.contains("| payoutPct |"));
}
