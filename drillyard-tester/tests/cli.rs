use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "drillyard-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_drillyard-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    std::fs::remove_file(&output_path).ok();
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("full-campaign"));
}

#[test]
fn cli_runs_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_drillyard-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "smoke,full-campaign",
            "--iterations",
            "1",
            "--seeds",
            "1,2",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Drillyard Automated Tester"));

    let report = std::fs::read_to_string(&output_path).expect("read report");
    std::fs::remove_file(&output_path).ok();
    let results: serde_json::Value = serde_json::from_str(&report).expect("json report");
    let results = results.as_array().expect("report is an array");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_rejects_invalid_campaign_file() {
    let exe = env!("CARGO_BIN_EXE_drillyard-tester");
    let config_path = temp_path("bad-config");
    std::fs::write(&config_path, "{ \"zones\": [] }").expect("write config");
    let output = Command::new(exe)
        .arg("--config")
        .arg(&config_path)
        .args(["--iterations", "1"])
        .output()
        .expect("run cli");
    std::fs::remove_file(&config_path).ok();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("campaign config failed validation"));
}
