// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for loading, reporting and the command-line interface.

use assert_cmd::Command;
use bmw_cardata::loader::{self, LoadError};
use bmw_cardata::records::{RecordFilter, RecordKind, find_records};
use bmw_cardata::report::{OutputFormat, ReportOptions, Reporter};
use predicates::str::contains;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LADEHISTORIE: &str = r#"[
    {
        "displayedSoc": 80,
        "displayedStartSoc": 20,
        "endTime": 1705767300,
        "energyConsumedFromPowerGridKwh": 40.0,
        "energyIncreaseHvbKwh": 38.0,
        "isPreconditioningActivated": true,
        "mileage": 12345,
        "mileageUnits": "KM",
        "startTime": 1705759500,
        "timeZone": "Europe/Berlin",
        "totalChargingDurationSec": 7530
    },
    {
        "displayedSoc": 100,
        "displayedStartSoc": 35,
        "endTime": 1705860000,
        "energyConsumedFromPowerGridKwh": 44.5,
        "energyIncreaseHvbKwh": 42.1,
        "isPreconditioningActivated": false,
        "mileage": 12410,
        "mileageUnits": "KM",
        "startTime": 1705840000,
        "timeZone": "Europe/Berlin",
        "totalChargingDurationSec": 20000
    }
]"#;

const REIFENDIAGNOSE: &str = r#"{
    "vin": "WBA00000000000000",
    "tyres": [
        {"wheelPosition": "FRONT_LEFT", "currentPressure": 2.4, "targetPressure": 2.5, "temperature": 17.0},
        {"wheelPosition": "FRONT_RIGHT", "currentPressure": 2.5, "targetPressure": 2.5, "temperature": 17.5}
    ]
}"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    path
}

fn report_files(paths: &[&Path], opts: ReportOptions) -> (String, usize) {
    let mut reporter = Reporter::new(Vec::new(), opts);
    let mut failed = 0;
    for path in paths {
        match loader::load_document(path) {
            Ok(doc) => {
                reporter.report(&doc).unwrap();
            }
            Err(_) => failed += 1,
        }
    }
    let out = String::from_utf8(reporter.finish().unwrap()).unwrap();
    (out, failed)
}

fn cmd() -> Command {
    Command::cargo_bin("bmw-cardata").unwrap()
}

/// A malformed file is reported and the remaining files are still processed.
#[test]
fn malformed_file_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let bad = write_file(&dir, "bad.json", "{\"truncated\": [1, 2");
    let good = write_file(&dir, "ladehistorie.json", LADEHISTORIE);

    assert!(matches!(
        loader::load_document(&bad),
        Err(LoadError::Parse { .. })
    ));

    let opts = ReportOptions {
        records: Some(RecordFilter::ChargingHistory),
        ..Default::default()
    };
    let (out, failed) = report_files(&[bad.as_path(), good.as_path()], opts);

    assert_eq!(failed, 1);
    assert_eq!(out.matches("Charging session").count(), 2);
}

/// CSV row count equals the number of matched records across files.
#[test]
fn csv_rows_match_record_count() {
    let dir = TempDir::new().unwrap();
    let first = write_file(&dir, "a.json", LADEHISTORIE);
    let second = write_file(&dir, "b.json", LADEHISTORIE);

    let opts = ReportOptions {
        records: Some(RecordFilter::ChargingHistory),
        format: OutputFormat::Csv,
        ..Default::default()
    };
    let (out, _) = report_files(&[first.as_path(), second.as_path()], opts);

    // Header plus two sessions per file
    assert_eq!(out.lines().count(), 5);
    assert!(out.starts_with("start,end,time_zone,"));
}

/// Text output grows with the document.
#[test]
fn text_line_count_is_monotonic() {
    let dir = TempDir::new().unwrap();
    let small = write_file(&dir, "small.json", r#"{"a": 1}"#);
    let large = write_file(&dir, "large.json", r#"{"a": 1, "b": {"c": [1, 2]}}"#);

    let (small_out, _) = report_files(&[small.as_path()], ReportOptions::default());
    let (large_out, _) = report_files(&[large.as_path()], ReportOptions::default());

    assert!(large_out.lines().count() > small_out.lines().count());
}

#[test]
fn cli_prints_tree_with_limit() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "tree.json", r#"{"a":{"b":1,"c":2}}"#);

    cmd()
        .args(["-l", "1"])
        .arg(&path)
        .assert()
        .success()
        .stdout("a = {...}\n");
}

#[test]
fn cli_extracts_tyre_records() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "reifen.json", REIFENDIAGNOSE);

    cmd()
        .arg("-R")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("[0] Tyre FRONT_LEFT"))
        .stdout(contains("[1] Tyre FRONT_RIGHT"));
}

#[test]
fn cli_writes_csv_to_output_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "ladehistorie.json", LADEHISTORIE);
    let output = dir.path().join("out.csv");

    cmd()
        .args(["-L", "-C", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success()
        .stdout("");

    let csv = fs::read_to_string(&output).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains(",Europe/Berlin,125,12345,KM,"));
}

#[test]
fn cli_exit_code_counts_failed_files() {
    let dir = TempDir::new().unwrap();
    let good = write_file(&dir, "good.json", LADEHISTORIE);
    let bad = write_file(&dir, "bad.json", "not json");
    let missing = dir.path().join("missing.json");

    cmd()
        .arg("-L")
        .arg(&bad)
        .arg(&good)
        .arg(&missing)
        .assert()
        .code(2)
        .stdout(contains("Charging session"))
        .stderr(contains("bad.json"))
        .stderr(contains("missing.json: file not found"));
}

#[test]
fn cli_expands_directories_in_name_order() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "2.json", r#"{"second": true}"#);
    write_file(&dir, "1.json", r#"{"first": true}"#);
    write_file(&dir, "notes.txt", "ignored");

    cmd()
        .arg(dir.path())
        .assert()
        .success()
        .stdout("first = true\nsecond = true\n");
}

#[test]
fn cli_rejects_csv_with_both_record_types() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "x.json", "{}");

    cmd()
        .args(["-L", "-R", "-C"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn cli_fails_when_output_cannot_be_created() {
    let dir = TempDir::new().unwrap();
    let input = write_file(&dir, "x.json", "{}");
    let output = dir.path().join("no-such-dir").join("out.txt");

    cmd()
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .assert()
        .failure();
}

/// Without a record filter the dump covers every record kind in the file.
#[test]
fn unset_filter_dumps_both_record_kinds() {
    let dir = TempDir::new().unwrap();
    let mixed = format!(r#"{{"ladehistorie": {LADEHISTORIE}, "reifen": {REIFENDIAGNOSE}}}"#);
    let path = write_file(&dir, "mixed.json", &mixed);

    let (text, _) = report_files(&[path.as_path()], ReportOptions::default());
    assert!(text.contains("energyIncreaseHvbKwh = 38.0"));
    assert!(text.contains("wheelPosition = \"FRONT_LEFT\""));

    let csv_opts = ReportOptions {
        format: OutputFormat::Csv,
        ..Default::default()
    };
    let (csv, _) = report_files(&[path.as_path()], csv_opts);
    assert!(csv.contains("ladehistorie[1].mileage,12410\n"));
    assert!(csv.contains("reifen.tyres[0].wheelPosition,FRONT_LEFT\n"));

    let doc = loader::load_document(&path).unwrap();
    let kinds: Vec<RecordKind> = find_records(&doc, None, RecordFilter::All)
        .map(|r| r.kind())
        .collect();
    assert_eq!(
        kinds,
        [
            RecordKind::ChargingSession,
            RecordKind::ChargingSession,
            RecordKind::TyreDiagnosis,
            RecordKind::TyreDiagnosis
        ]
    );
}

#[test]
fn cli_shows_charging_times_in_local_zone() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "ladehistorie.json", LADEHISTORIE);

    cmd()
        .arg("-L")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("[0] Charging session 2024-01-20 15:05 / 125 min"));
}

/// A failing output sink is blamed on the file being written.
#[cfg(target_os = "linux")]
#[test]
fn cli_reports_write_failure_against_input_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "ladehistorie.json", LADEHISTORIE);

    cmd()
        .args(["-L", "-C", "-o", "/dev/full"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(contains("failed to report"))
        .stderr(contains("ladehistorie.json"));
}

#[test]
fn cli_output_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "reifen.json", REIFENDIAGNOSE);

    let run = || cmd().arg(&path).output().unwrap().stdout;
    assert_eq!(run(), run());
}
