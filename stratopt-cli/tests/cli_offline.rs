//! End-to-end runs of the `stratopt` binary against the offline backend.

use std::path::Path;
use std::process::{Command, Output};

fn stratopt(settings_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stratopt"))
        .arg("--offline")
        .arg("--settings-dir")
        .arg(settings_dir)
        .arg("--config")
        .arg(settings_dir.join("client.toml"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run stratopt")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn grid_counts_combinations() {
    let dir = tempfile::tempdir().unwrap();

    // GIVEN: MA over three values, everything else at its one-point default
    // WHEN: the grid is expanded
    let out = stratopt(dir.path(), &["grid", "--ma", "40:60:10"]);

    // THEN: three combinations are reported
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("40, 50, 60"), "{text}");
    assert!(text.contains("Combinations: 3"), "{text}");
}

#[test]
fn zero_step_is_rejected_with_the_param_name() {
    let dir = tempfile::tempdir().unwrap();
    let out = stratopt(dir.path(), &["grid", "--ma", "40:60:0"]);
    assert!(!out.status.success());
    let err = stderr(&out);
    assert!(err.contains("MA"), "{err}");
    assert!(err.contains("step must be non-zero"), "{err}");
}

#[test]
fn optimize_prints_table_and_exports_chart_with_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("chart.csv");

    // GIVEN: a four-point sweep with the buy-and-hold overlay
    let out = stratopt(
        dir.path(),
        &[
            "optimize",
            "--ma",
            "40:55:5",
            "--with-buyhold",
            "--export",
            csv_path.to_str().unwrap(),
        ],
    );

    // THEN: the table has four rows and the best one is starred
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.starts_with("Best: MA="), "{text}");
    assert!(text.lines().any(|l| l.starts_with("   4 ")), "{text}");
    assert!(!text.lines().any(|l| l.starts_with("   5 ")), "{text}");
    assert_eq!(text.lines().filter(|l| l.get(5..6) == Some("*")).count(), 1, "{text}");

    // AND: the exported chart carries both curves
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("date,strategy,buyhold\n"), "{csv}");
    assert!(csv.lines().count() > 2);
}

#[test]
fn drill_into_a_row_runs_its_backtest() {
    let dir = tempfile::tempdir().unwrap();
    let out = stratopt(dir.path(), &["optimize", "--ma", "40:55:5", "--drill", "3"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("=== Row 3: MA="), "{text}");
    assert!(text.contains("Final value:"), "{text}");
}

#[test]
fn drill_past_the_table_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = stratopt(dir.path(), &["optimize", "--drill", "9"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("the table has 1 rows"));
}

#[test]
fn settings_persist_between_runs() {
    let dir = tempfile::tempdir().unwrap();

    // GIVEN: the cash rate is changed in one run
    let out = stratopt(dir.path(), &["settings", "--cash-rate", "0.02", "--start", "cash"]);
    assert!(out.status.success(), "{}", stderr(&out));

    // WHEN: the settings are shown in a later run
    let out = stratopt(dir.path(), &["settings"]);

    // THEN: the change was persisted under the fixed key
    let text = stdout(&out);
    assert!(text.contains("cash rate:      0.02"), "{text}");
    assert!(text.contains("start:          Cash"), "{text}");
    assert!(dir.path().join("strat-opt-settings.json").exists());
}

#[test]
fn signal_and_buyhold_report() {
    let dir = tempfile::tempdir().unwrap();

    let out = stratopt(dir.path(), &["signal", "--set", "MA=45"]);
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(
        ["BUY", "SELL", "HOLD"].iter().any(|s| text.contains(&format!(": {s} (as of"))),
        "{text}"
    );

    let out = stratopt(dir.path(), &["buyhold"]);
    assert!(out.status.success(), "{}", stderr(&out));
    assert!(stdout(&out).contains("buy & hold ==="));
}

#[test]
fn config_set_validates_ranges() {
    let dir = tempfile::tempdir().unwrap();

    let out = stratopt(
        dir.path(),
        &["config", "set", "--value", "MA=55", "--range", "MA=40:60:10"],
    );
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("MA                 55.0"), "{text}");
    assert!(text.contains("MA           40:60:10"), "{text}");

    let out = stratopt(dir.path(), &["config", "set", "--range", "MA=60:40:10"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("refusing to save invalid default ranges"));
}
