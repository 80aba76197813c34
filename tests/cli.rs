//! Runs the `cronfleet` binary against temporary configuration trees.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const REPORT_JOB: &str = "Cron: \"0 * * * *\"\nCluster: batch\nTaskDefinition: report\n";

fn setup(config: &str) -> TempDir {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("config.yml"), config).unwrap();
    fs::create_dir(root.path().join("dags")).unwrap();
    fs::write(root.path().join("dags").join("report.yml"), REPORT_JOB).unwrap();
    root
}

fn cronfleet(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cronfleet"))
        .arg("--config")
        .arg(root.join("config.yml"))
        .arg("--dag-dir")
        .arg(root.join("dags"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap()
}

#[test]
fn test_validate_accepts_good_config() {
    let root = setup("Redis:\n  Url: memory\nNotification:\n  - Driver: log\n");
    let output = cronfleet(root.path(), &["validate"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("job report: \"0 * * * *\" on batch (report)"));
    assert!(stdout.contains("1 job(s) OK"));
    assert!(stdout.contains("warning: Redis.Url"));
}

#[test]
fn test_validate_reports_every_error() {
    let root = setup(
        "Redis:\n  KeyPrefix: \"\"\nNotification:\n  - Driver: email\nLoops:\n  LogLines: 0\n",
    );
    let output = cronfleet(root.path(), &["validate"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("error: Redis.KeyPrefix"));
    assert!(stdout.contains("error: Notification[0].Driver"));
    assert!(stdout.contains("error: Loops.LogLines"));
}

#[test]
fn test_validate_rejects_bad_job() {
    let root = setup("");
    fs::write(
        root.path().join("dags").join("broken.yml"),
        "Cron: \"61 * * * *\"\nCluster: batch\nTaskDefinition: broken\n",
    )
    .unwrap();
    let output = cronfleet(root.path(), &["validate"]);
    assert!(!output.status.success());
}

#[test]
fn test_next_lists_every_job() {
    let root = setup("");
    fs::write(
        root.path().join("dags").join("cleanup.yaml"),
        "Cron: \"0 3 * * 0\"\nCluster: batch\nTaskDefinition: cleanup\n",
    )
    .unwrap();
    let output = cronfleet(root.path(), &["next", "-n", "2"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("cleanup: "));
    assert!(lines[1].starts_with("report: "));
    assert_eq!(lines[1].matches(":00:00Z").count(), 2);
}

#[test]
fn test_missing_dag_dir_fails() {
    let root = setup("");
    fs::remove_dir_all(root.path().join("dags")).unwrap();
    let output = cronfleet(root.path(), &["next"]);
    assert!(!output.status.success());
}

#[test]
fn test_validate_accepts_full_override_shape() {
    let root = setup("Redis:\n  Url: memory\n");
    fs::write(
        root.path().join("dags").join("gpu.yml"),
        "Cron: \"0 2 * * *\"\nCluster: batch\nTaskDefinition: gpu\n\
         Overrides:\n  EphemeralStorage:\n    SizeInGiB: 50\n  ContainerOverrides:\n\
         \x20   - Name: app\n      ResourceRequirements:\n        - Type: GPU\n          Value: \"1\"\n\
         \x20     EnvironmentFiles:\n        - Type: s3\n          Value: arn:aws:s3:::conf/app.env\n",
    )
    .unwrap();
    let output = cronfleet(root.path(), &["validate"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("2 job(s) OK"));
}

#[test]
fn test_validate_reports_bad_launch_params() {
    let root = setup("Redis:\n  Url: memory\n");
    fs::write(
        root.path().join("dags").join("typo.yml"),
        "Cron: \"0 2 * * *\"\nCluster: batch\nTaskDefinition: typo\n\
         Overrides:\n  ContainerOverides: []\n",
    )
    .unwrap();
    let output = cronfleet(root.path(), &["validate"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(!output.status.success());
    assert!(stdout.contains("error: job typo: Invalid launch parameters: Overrides"));
    assert!(!stdout.contains("job(s) OK"));
}

#[test]
fn test_run_refuses_bad_launch_params() {
    let root = setup("Redis:\n  Url: memory\n");
    fs::write(
        root.path().join("dags").join("typo.yml"),
        "Cron: \"0 2 * * *\"\nCluster: batch\nTaskDefinition: typo\n\
         NetworkConfiguration:\n  AwsvpcConfiguration:\n    SecurityGroups: [sg-1]\n",
    )
    .unwrap();
    let output = cronfleet(root.path(), &["run", "--loops", "scheduler"]);
    assert!(!output.status.success());
}
