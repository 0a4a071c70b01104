use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

const T0: f64 = 50_000.0;

// Minimal config: everything not listed takes its default
fn write_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[tracking]
time_int_s = 0.005
lookahead_len = 20

[logging]
level = "error"
"#;
    let path = dir.path().join("mcs.toml");
    fs::write(&path, toml).unwrap();
    path
}

// 20 Hz ramp, applied 150 ms after sending
fn write_demands(dir: &tempfile::TempDir, n: usize) -> PathBuf {
    let mut csv = String::from("send_time,apply_time,track_id,azimuth,elevation\n");
    for i in 0..n {
        let send = T0 + i as f64 * 0.05;
        let apply = send + 0.15;
        let az = 100.0 + 0.5 * (apply - T0);
        let el = 45.0 + 0.2 * (apply - T0);
        writeln!(csv, "{send:.3},{apply:.3},7,{az:.6},{el:.6}").unwrap();
    }
    let path = dir.path().join("demands.csv");
    fs::write(&path, csv).unwrap();
    path
}

fn mcs() -> Command {
    Command::cargo_bin("mcs").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["check-config"], 0, "config ok", "stdout")]
#[case(&["fit", "--point", "0,1"], 1, "exactly three", "stderr")]
#[case(&["fit", "--point", "0,1", "--point", "0,2", "--point", "1,3"], 4, "sample times are equal", "stderr")]
#[case(&["fit", "--point", "zero,1"], 2, "bad time", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);

    let mut cmd = mcs();
    cmd.arg("--config").arg(&cfg).args(args);
    let assert = cmd.assert().code(exit_code);
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

#[rstest]
#[case(
    "[axes.azimuth]\nlower_limit = 0.0\nupper_limit = 10.0\nmax_vel = 0.0\nmax_acc = 1.0\n",
    "max_vel must be > 0"
)]
#[case("[tracking]\ntime_int_s = \"fast\"\n", "not valid TOML")]
#[case("[limiter]\njump_threshold_deg = -1.0\n", "jump_threshold_deg must be >= 0")]
fn bad_config_exits_with_two(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();
    mcs()
        .arg("--config")
        .arg(&cfg)
        .arg("check-config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    mcs()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("check-config")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("could not be read"));
}

#[test]
fn fit_prints_coefficients_as_json() {
    let out = mcs()
        .args(["--json", "fit", "--point", "0,0", "--point", "1,1", "--point", "2,4"])
        .args(["--at", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["model"], "quadratic");
    assert!((v["c2"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    assert!((v["at"]["position"].as_f64().unwrap() - 9.0).abs() < 1e-9);
    assert!((v["at"]["velocity"].as_f64().unwrap() - 6.0).abs() < 1e-9);
}

#[test]
fn linear_fit_uses_latest_two_points() {
    let out = mcs()
        .args(["--json", "fit", "--linear"])
        .args(["--point", "0,0", "--point", "1,1", "--point", "2,4"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["model"], "linear");
    assert!((v["c1"].as_f64().unwrap() - 3.0).abs() < 1e-9);
    assert_eq!(v["c2"].as_f64().unwrap(), 0.0);
}

#[test]
fn replay_summary_in_text_mode() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let demands = write_demands(&dir, 40);
    mcs()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--demands")
        .arg(&demands)
        .assert()
        .success()
        .stdout(predicate::str::contains("replay complete").and(predicate::str::contains("0 errors")))
        .stdout(predicate::str::contains("trigger armed at"));
}

#[test]
fn replay_rejects_bad_demand_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir);
    let bad = dir.path().join("bad.csv");
    fs::write(&bad, "t,az,el\n1,2,3\n").unwrap();
    mcs()
        .arg("--config")
        .arg(&cfg)
        .arg("replay")
        .arg("--demands")
        .arg(&bad)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid headers in demand CSV"));
}
