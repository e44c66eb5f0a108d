//! Integration tests for the QCT CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get a qct command acting as user "qa"
fn qct(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("qct").unwrap();
    cmd.current_dir(tmp.path())
        .env("QCT_USER", "qa")
        .env_remove("QCT_LOG")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    qct(&tmp).arg("init").assert().success();
    tmp
}

/// Measure point on SHAFT-10 (QCP00001) and a generic visual point (QCP00002)
fn setup_points(tmp: &TempDir) {
    qct(tmp)
        .args([
            "point", "new", "-t", "Shaft diameter", "-p", "SHAFT-10", "--test", "measure", "--norm",
            "10", "--min", "9.9", "--max", "10.1", "--unit", "mm",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quality point QCP00001"));

    qct(tmp)
        .args(["point", "new", "-t", "Visual aspect", "--failure-message", "Quarantine the lot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quality point QCP00002"));
}

/// Process a receipt of SHAFT-10 creating QC00001 (measure) and QC00002 (visual)
fn run_receipt(tmp: &TempDir) {
    qct(tmp)
        .args(["run", "WH/IN/00001", "--type", "receipts", "--line", "SHAFT-10:LOT-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 2 check(s) for operation WH/IN/00001"));
}

fn count(tmp: &TempDir, args: &[&str]) -> String {
    let output = qct(tmp).args(args).output().unwrap();
    assert!(output.status.success());
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("point"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("alert"));
}

#[test]
fn test_version_displays() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("qct"));
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qct"));
}

#[test]
fn test_command_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp).args(["point", "list"]).assert().failure();
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_structure() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized QCT project"));

    assert!(tmp.path().join(".qct/config.yaml").is_file());
    assert!(tmp.path().join(".qct/stages.yaml").is_file());
    assert!(tmp.path().join("quality/points").is_dir());
    assert!(tmp.path().join("quality/checks").is_dir());
    assert!(tmp.path().join("quality/alerts").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    qct(&tmp)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// ============================================================================
// Point Tests
// ============================================================================

#[test]
fn test_point_new_list_show() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    let files: Vec<_> = fs::read_dir(tmp.path().join("quality/points"))
        .unwrap()
        .collect();
    assert_eq!(files.len(), 2);

    qct(&tmp)
        .args(["point", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QCP00001"))
        .stdout(predicate::str::contains("Shaft diameter"))
        .stdout(predicate::str::contains("2 quality point(s) found"));

    qct(&tmp)
        .args(["point", "show", "QCP00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: measure"))
        .stdout(predicate::str::contains("tolerance_max: 10.1"))
        .stdout(predicate::str::contains("product: SHAFT-10"));

    // Short IDs from the last listing
    qct(&tmp)
        .args(["point", "show", "QCP@2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Visual aspect"));
}

#[test]
fn test_point_list_filters_and_count() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    assert_eq!(count(&tmp, &["point", "list", "--count"]), "2");
    assert_eq!(count(&tmp, &["point", "list", "--test", "measure", "--count"]), "1");
    // Generic points apply to every product
    assert_eq!(count(&tmp, &["point", "list", "-p", "OTHER", "--count"]), "1");
}

#[test]
fn test_point_list_json() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    let output = qct(&tmp)
        .args(["point", "list", "-f", "json"])
        .output()
        .unwrap();
    let points: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(points.as_array().unwrap().len(), 2);
}

#[test]
fn test_point_new_rejects_bad_tolerances() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args([
            "point", "new", "-t", "Bore", "--test", "measure", "--norm", "10", "--min", "10.5",
            "--max", "9.5",
        ])
        .assert()
        .failure();
    qct(&tmp)
        .args(["point", "new", "-t", "Bore", "--test", "measure"])
        .assert()
        .failure();

    assert_eq!(count(&tmp, &["point", "list", "--count"]), "0");
}

#[test]
fn test_point_new_periodical_frequency() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args([
            "point", "new", "-t", "Weekly audit", "--frequency", "periodical", "--interval", "1",
            "--period", "week",
        ])
        .assert()
        .success();

    qct(&tmp)
        .args(["point", "show", "QCP00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("policy: periodical"))
        .stdout(predicate::str::contains("unit: week"));

    // Only the first operation inside the window gets a check
    qct(&tmp)
        .args(["run", "OP-1", "--line", "P1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 1 check(s)"));
    qct(&tmp)
        .args(["run", "OP-2", "--line", "P1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quality checks needed"));
}

#[test]
fn test_point_delete_refused_when_referenced() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["point", "delete", "QCP00001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("archive it instead"));
    assert_eq!(count(&tmp, &["point", "list", "--count"]), "2");
}

#[test]
fn test_point_delete_unreferenced() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    qct(&tmp)
        .args(["point", "delete", "QCP00002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted quality point QCP00002"));
    assert_eq!(count(&tmp, &["point", "list", "--count"]), "1");
}

#[test]
fn test_archived_point_stops_generating_checks() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    qct(&tmp)
        .args(["point", "archive", "QCP00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Archived quality point"));

    qct(&tmp)
        .args(["run", "WH/IN/00002", "--line", "SHAFT-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 1 check(s)"));

    assert_eq!(count(&tmp, &["point", "list", "--count"]), "1");
    assert_eq!(count(&tmp, &["point", "list", "--status", "archived", "--count"]), "1");

    qct(&tmp)
        .args(["point", "archive", "QCP00001"])
        .assert()
        .failure();
    qct(&tmp)
        .args(["point", "restore", "QCP00001"])
        .assert()
        .success();
}

// ============================================================================
// Operation processing
// ============================================================================

#[test]
fn test_run_creates_checks() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "list", "-o", "WH/IN/00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QC00001"))
        .stdout(predicate::str::contains("QC00002"))
        .stdout(predicate::str::contains("LOT-1"));

    qct(&tmp)
        .args(["check", "show", "QC00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("operation: WH/IN/00001"))
        .stdout(predicate::str::contains("operation_type: receipts"))
        .stdout(predicate::str::contains("quality_state: none"));
}

#[test]
fn test_run_twice_does_not_duplicate() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["run", "WH/IN/00001", "--type", "receipts", "--line", "SHAFT-10:LOT-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quality checks needed"));
    assert_eq!(count(&tmp, &["check", "list", "--count"]), "2");
}

#[test]
fn test_run_dry_run_writes_nothing() {
    let tmp = setup_test_project();
    setup_points(&tmp);

    qct(&tmp)
        .args(["run", "WH/IN/00009", "--line", "SHAFT-10", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create 2 check(s)"));
    assert_eq!(count(&tmp, &["check", "list", "--count"]), "0");
}

#[test]
fn test_run_operation_type_filter() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["point", "new", "-t", "Receipt only", "--operation-type", "receipts"])
        .assert()
        .success();

    qct(&tmp)
        .args(["run", "WH/OUT/00001", "--type", "delivery", "--line", "P1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quality checks needed"));
    qct(&tmp)
        .args(["run", "WH/IN/00001", "--type", "receipts", "--line", "P1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 1 check(s)"));
}

#[test]
fn test_run_requires_a_line() {
    let tmp = setup_test_project();
    qct(&tmp).args(["run", "WH/IN/00001"]).assert().failure();
}

// ============================================================================
// Check decisions
// ============================================================================

#[test]
fn test_measure_outside_tolerance_fails() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "measure", "QC00001", "10.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("outside tolerance"))
        .stdout(predicate::str::contains("Check QC00001 is now fail"))
        .stdout(predicate::str::contains("Next: QC00002"));

    qct(&tmp)
        .args(["check", "show", "QC00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quality_state: fail"))
        .stdout(predicate::str::contains("measure: 10.5"))
        .stdout(predicate::str::contains("responsible: qa"));
}

#[test]
fn test_measure_within_tolerance_passes() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "measure", "QC00001", "10.05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("within tolerance"))
        .stdout(predicate::str::contains("Check QC00001 is now pass"));
}

#[test]
fn test_measure_on_pass_fail_check_refused() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "measure", "QC00002", "1"])
        .assert()
        .failure();
    qct(&tmp)
        .args(["check", "show", "QC00002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("quality_state: none"));
}

#[test]
fn test_pass_last_check_closes_batch() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "pass", "QC00002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Next: QC00001"));
    qct(&tmp)
        .args(["check", "measure", "QC00001", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No more checks to do"));
}

#[test]
fn test_fail_shows_failure_message() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "fail", "QC00002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now fail"))
        .stdout(predicate::str::contains("Quarantine the lot"));
}

#[test]
fn test_picture_check_needs_picture_to_pass() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["point", "new", "-t", "Label photo", "--test", "picture"])
        .assert()
        .success();
    qct(&tmp)
        .args(["run", "OP-1", "--line", "P1"])
        .assert()
        .success();

    qct(&tmp)
        .args(["check", "pass", "QC00001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("picture"));
    qct(&tmp)
        .args(["check", "pass", "QC00001", "--picture", "photos/label.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now pass"));
}

#[test]
fn test_check_list_state_filter() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);
    qct(&tmp).args(["check", "fail", "QC00002"]).assert().success();

    assert_eq!(count(&tmp, &["check", "list", "--state", "fail", "--count"]), "1");
    assert_eq!(count(&tmp, &["check", "list", "--state", "none", "--count"]), "1");
    assert_eq!(count(&tmp, &["check", "list", "--point", "QCP00001", "--count"]), "1");
}

#[test]
fn test_manual_check() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["check", "new", "-t", "Spot check", "-p", "P9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quality check QC00001"));
    qct(&tmp)
        .args(["check", "show", "QC00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("type: pass_fail"));
}

#[test]
fn test_reset_requires_admin() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);
    qct(&tmp).args(["check", "pass", "QC00002"]).assert().success();

    qct(&tmp)
        .args(["check", "reset", "QC00002"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("administrator"));

    fs::write(tmp.path().join(".qct/config.yaml"), "admins:\n  - qa\n").unwrap();
    qct(&tmp)
        .args(["check", "reset", "QC00002", "--reason", "wrong lot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now none"));
}

// ============================================================================
// Alerts
// ============================================================================

#[test]
fn test_alert_from_failed_check() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);
    qct(&tmp)
        .args(["check", "measure", "QC00001", "10.5"])
        .assert()
        .success();

    qct(&tmp)
        .args(["check", "alert", "QC00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Raised quality alert from check QC00001"))
        .stdout(predicate::str::contains("QA00001"));

    qct(&tmp)
        .args(["alert", "show", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stage: new"))
        .stdout(predicate::str::contains("product: SHAFT-10"))
        .stdout(predicate::str::contains("lot: LOT-1"));

    qct(&tmp)
        .args(["check", "alerts", "QC00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("QA00001"));

    qct(&tmp)
        .args(["point", "show", "QCP00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alerts:"));
}

#[test]
fn test_alert_requires_failed_check() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .args(["check", "alert", "QC00002"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("only failed checks"));
    assert_eq!(count(&tmp, &["alert", "list", "--count"]), "0");
}

#[test]
fn test_alert_stage_lifecycle() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["alert", "new", "-t", "Supplier scratches", "--priority", "high"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created quality alert QA00001"));

    qct(&tmp)
        .args(["alert", "move", "QA00001", "confirmed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is in stage confirmed"));

    qct(&tmp)
        .args(["alert", "move", "QA00001", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("backward"));

    qct(&tmp)
        .args(["alert", "advance", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("action_proposed"));

    qct(&tmp)
        .args(["alert", "close", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("solved"));
    qct(&tmp)
        .args(["alert", "show", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date_close"));
    assert_eq!(count(&tmp, &["alert", "list", "--status", "open", "--count"]), "0");

    qct(&tmp)
        .args(["alert", "reopen", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is in stage new"));
    qct(&tmp)
        .args(["alert", "show", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date_close").not());
}

#[test]
fn test_alert_close_with_custom_pipeline() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join(".qct/stages.yaml"),
        "stages:\n\
         - key: cancelled\n  name: Cancelled\n  sequence: 0\n  done: true\n\
         - key: todo\n  name: To Do\n  sequence: 5\n  done: false\n",
    )
    .unwrap();
    qct(&tmp)
        .args(["alert", "new", "-t", "Dent"])
        .assert()
        .success();

    qct(&tmp)
        .args(["alert", "close", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is in stage cancelled"));
    qct(&tmp)
        .args(["alert", "show", "QA00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("date_close"));
}

#[test]
fn test_alert_unknown_stage() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["alert", "new", "-t", "Dent"])
        .assert()
        .success();
    qct(&tmp)
        .args(["alert", "move", "QA00001", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown alert stage"));
}

#[test]
fn test_alert_assign_and_cause() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["alert", "new", "-t", "Dent"])
        .assert()
        .success();

    qct(&tmp)
        .args(["alert", "assign", "QA00001", "maria"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Assigned alert QA00001 to maria"));

    qct(&tmp)
        .args(["alert", "cause", "QA00001", "parts quality"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Parts Quality"));

    qct(&tmp)
        .args(["alert", "cause", "QA00001", "bad luck"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown root cause"));

    assert_eq!(count(&tmp, &["alert", "list", "--responsible", "maria", "--count"]), "1");
}

#[test]
fn test_stage_list() {
    let tmp = setup_test_project();
    qct(&tmp)
        .args(["stage", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("action_proposed"))
        .stdout(predicate::str::contains("solved"));
}

// ============================================================================
// Stats, report, import, validate
// ============================================================================

#[test]
fn test_stats_counts() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);
    qct(&tmp)
        .args(["check", "measure", "QC00001", "10.5"])
        .assert()
        .success();
    qct(&tmp).args(["check", "alert", "QC00001"]).assert().success();

    let output = qct(&tmp)
        .args(["stats", "SHAFT-10", "-f", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let shaft = &stats[0];
    assert_eq!(shaft["product"], "SHAFT-10");
    assert_eq!(shaft["control_point_qty"], 2);
    assert_eq!(shaft["pass_qty"], 0);
    assert_eq!(shaft["fail_qty"], 1);
    assert_eq!(shaft["pending_qty"], 0);
    assert_eq!(shaft["open_alerts"], 1);
}

#[test]
fn test_report_markdown() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);
    qct(&tmp).args(["check", "fail", "QC00002"]).assert().success();

    qct(&tmp)
        .args(["report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Quality Control Report"))
        .stdout(predicate::str::contains("| Failed"))
        .stdout(predicate::str::contains("## Recent Failures"));

    qct(&tmp)
        .args(["report", "-o", "report.md"])
        .assert()
        .success();
    assert!(tmp.path().join("report.md").is_file());
}

#[test]
fn test_import_points() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("points.csv"),
        "title,product,test_type,frequency,percent\n\
         Visual,P1,pass_fail,,\n\
         Sampled hardness,P2,pass_fail,random,20\n",
    )
    .unwrap();

    qct(&tmp)
        .args(["import", "points", "points.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created QCP00001"))
        .stdout(predicate::str::contains("Created QCP00002"));
    assert_eq!(count(&tmp, &["point", "list", "--count"]), "2");
}

#[test]
fn test_import_error_writes_nothing() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("points.csv"),
        "title,test_type\n\
         Visual,pass_fail\n\
         Bore,measure\n",
    )
    .unwrap();

    qct(&tmp)
        .args(["import", "points", "points.csv"])
        .assert()
        .failure();
    assert_eq!(count(&tmp, &["point", "list", "--count"]), "0");

    qct(&tmp)
        .args(["import", "points", "points.csv", "--skip-errors"])
        .assert()
        .success();
    assert_eq!(count(&tmp, &["point", "list", "--count"]), "1");
}

#[test]
fn test_import_template() {
    let tmp = TempDir::new().unwrap();
    qct(&tmp)
        .args(["import", "points", "--template"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("title,product,operation_types"));
}

#[test]
fn test_validate_clean_project() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    run_receipt(&tmp);

    qct(&tmp)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files passed validation"));
}

#[test]
fn test_corrupt_record_is_reported() {
    let tmp = setup_test_project();
    setup_points(&tmp);
    fs::write(
        tmp.path().join("quality/checks/QC-01HQ3K4N5M6P7R8S9T0UVWXYZA.qct.yaml"),
        "title: [unclosed\n",
    )
    .unwrap();

    qct(&tmp).arg("validate").assert().failure();
    // Loading is strict: counts must never silently skip records
    qct(&tmp)
        .args(["check", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("QC-01HQ3K4N5M6P7R8S9T0UVWXYZA.qct.yaml"))
        .stderr(predicate::str::contains("here"));
}
