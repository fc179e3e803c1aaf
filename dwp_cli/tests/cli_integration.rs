use assert_cmd::Command;
use predicates::prelude::*;

const VALID_CONFIG: &str = r#"
[[devices]]
name = "plc1"
address = "10.0.0.1:502"

[[devices.lines]]
line = "g5"

[[devices.lines.machines]]
name = "mc1"
addr_th_l = 0
addr_th_r = 1
addr_side_l = 2
addr_side_r = 3
"#;

#[test]
fn help_lists_commands() {
    Command::cargo_bin("dwp")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run").and(predicate::str::contains("check")));
}

#[test]
fn check_accepts_a_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dwp.toml");
    std::fs::write(&path, VALID_CONFIG).unwrap();

    Command::cargo_bin("dwp")
        .unwrap()
        .args(["--config", path.to_str().unwrap(), "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("plc1").and(predicate::str::contains("G5")));
}

#[test]
fn check_rejects_duplicate_lines_across_devices() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dwp.toml");
    let config = format!(
        "{VALID_CONFIG}\n[[devices]]\nname = \"plc2\"\naddress = \"10.0.0.2:502\"\n\n[[devices.lines]]\nline = \" G5 \"\n"
    );
    std::fs::write(&path, config).unwrap();

    Command::cargo_bin("dwp")
        .unwrap()
        .args(["--config", path.to_str().unwrap(), "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already used"));
}

#[test]
fn missing_config_file_fails_with_context() {
    Command::cargo_bin("dwp")
        .unwrap()
        .args(["--config", "/nonexistent/dwp.toml", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config"));
}

#[test]
fn invalid_detector_settings_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dwp.toml");
    let config = format!("[detector]\nmin_samples = 0\n{VALID_CONFIG}");
    std::fs::write(&path, config).unwrap();

    Command::cargo_bin("dwp")
        .unwrap()
        .args(["--config", path.to_str().unwrap(), "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_samples"));
}
