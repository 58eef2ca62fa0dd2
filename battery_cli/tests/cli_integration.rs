use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

// voltage code 1000 -> 1221 mV at the converter, current code 100 -> 122 mV.
const VOLTAGE_NOW: &str = "2650133";
const CURRENT_NOW: &str = "162666";

fn write_config(dir: &tempfile::TempDir, exclusive: bool) -> PathBuf {
    let toml = format!(
        r#"
[device]
name = "lego-ev3-battery"

[sampling]
# slow pacing keeps the stream out of the way of one-shot reads
rate_hz = 1

[simulation]
voltage_code = 1000
current_code = 100
exclusive = {exclusive}
"#
    );
    let path = dir.path().join("battery.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn battery(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("battery_cli").unwrap();
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["props"], 0, " rw", "stdout")]
#[case(&["get", "voltage_now"], 0, VOLTAGE_NOW, "stdout")]
#[case(&["get", "current_now"], 0, CURRENT_NOW, "stdout")]
#[case(&["get", "scope"], 0, "System", "stdout")]
#[case(&["get", "voltage_max_design"], 0, "9000000", "stdout")]
#[case(&["--rechargeable", "get", "voltage_max_design"], 0, "8400000", "stdout")]
#[case(&["--rechargeable", "get", "technology"], 0, "Li-ion", "stdout")]
#[case(&["set", "technology", "NiMH"], 0, "voltage_max_design=7800000", "stdout")]
#[case(&["--rechargeable", "set", "technology", "NiMH"], 6, "Invalid request", "stderr")]
#[case(&["set", "technology", "Li-ion"], 6, "Invalid request", "stderr")]
#[case(&["set", "voltage_now", "1"], 6, "read-only", "stderr")]
#[case(&["get", "capacity"], 6, "unknown property", "stderr")]
#[case(&["get"], 2, "required", "stderr")]
#[case(&["self-check"], 0, "ok", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, false);

    let assert = battery(&cfg).args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn exclusive_source_answers_from_the_stream_cache() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, true);
    battery(&cfg)
        .args(["get", "voltage_now"])
        .assert()
        .success()
        .stdout(predicate::str::contains(VOLTAGE_NOW));
}

#[test]
fn status_json_lists_every_property() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, true);
    let out = battery(&cfg)
        .args(["--json", "status"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let props = v["properties"].as_object().unwrap();
    assert_eq!(props.len(), 6);
    assert_eq!(props["technology"], "Unknown");
    assert_eq!(props["voltage_now"], VOLTAGE_NOW.parse::<i64>().unwrap());
    assert_eq!(props["scope"], "System");
    assert!(v["samples"].as_u64().unwrap() >= 1);
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, false);
    let out = battery(&cfg)
        .args(["--json", "get", "capacity"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(6));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(v["reason"], "InvalidRequest");
    assert_eq!(v["code"], 6);
}

#[test]
fn watch_writes_csv_rows() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, false);
    let csv = dir.path().join("samples.csv");
    battery(&cfg)
        .args(["watch", "--interval-ms", "1", "--count", "3", "--csv"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("voltage_now=").count(3));

    let text = fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "elapsed_ms,voltage_uv,current_ua,samples");
    assert!(lines[1..].iter().all(|l| l.contains(VOLTAGE_NOW)));
}

#[test]
fn invalid_config_is_rejected_before_bring_up() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[sampling]\nrate_hz = 0\n").unwrap();
    battery(&cfg)
        .arg("props")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempdir().unwrap();
    battery(&dir.path().join("nope.toml"))
        .arg("props")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not load the configuration"));
}

#[test]
fn unknown_channel_fails_bring_up() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("chan.toml");
    fs::write(&cfg, "[channels]\nvoltage = \"vbat\"\ncurrent = \"ibat\"\n").unwrap();
    battery(&cfg)
        .arg("self-check")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Bring-up failed"));
}

#[test]
fn missing_default_config_means_defaults() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("battery_cli")
        .unwrap()
        .current_dir(dir.path())
        .args(["get", "scope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("System"));
}
