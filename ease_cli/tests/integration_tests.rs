//! Integration tests for the painease binary.
//!
//! These tests verify end-to-end behavior including:
//! - Guided runs and their event stream
//! - Journaling and history
//! - Offline audio rendering

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("painease"))
}

fn run_json(data_dir: &std::path::Path, program_id: &str) -> Vec<Value> {
    let output = cli()
        .arg("run")
        .arg(program_id)
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--instant")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    String::from_utf8(output)
        .expect("stdout is not UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("event line is not JSON"))
        .collect()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Guided pain-relief exercise sessions and therapeutic audio",
        ));
}

#[test]
fn test_programs_lists_catalog() {
    cli()
        .arg("programs")
        .assert()
        .success()
        .stdout(predicate::str::contains("beginner-pain-relief"))
        .stdout(predicate::str::contains("back-pain-relief"))
        .stdout(predicate::str::contains("arthritis-mobility"));
}

#[test]
fn test_tones_lists_catalog() {
    cli()
        .arg("tones")
        .assert()
        .success()
        .stdout(predicate::str::contains("528Hz"))
        .stdout(predicate::str::contains("Repair and renewal"))
        .stdout(predicate::str::contains("forest"));
}

#[test]
fn test_run_emits_events_in_order() {
    let temp_dir = setup_test_dir();
    let events = run_json(temp_dir.path(), "back-pain-relief");

    let names: Vec<&str> = events
        .iter()
        .map(|e| e["event"].as_str().unwrap())
        .collect();
    assert_eq!(names.first(), Some(&"sessionStarted"));
    assert_eq!(names.last(), Some(&"sessionCompleted"));
    assert_eq!(names.iter().filter(|n| **n == "sessionCompleted").count(), 1);

    // Exercise N completes before exercise N+1 starts
    let lifecycle: Vec<(String, u64)> = events
        .iter()
        .filter(|e| {
            matches!(
                e["event"].as_str(),
                Some("exerciseStarted") | Some("exerciseCompleted")
            )
        })
        .map(|e| {
            (
                e["event"].as_str().unwrap().to_string(),
                e["index"].as_u64().unwrap(),
            )
        })
        .collect();
    let expected: Vec<(String, u64)> = (0..3)
        .flat_map(|i| {
            [
                ("exerciseStarted".to_string(), i),
                ("exerciseCompleted".to_string(), i),
            ]
        })
        .collect();
    assert_eq!(lifecycle, expected);

    let completed = events.last().unwrap();
    assert_eq!(completed["metrics"]["exercises_completed"], 3);
    // Two distinct kinds: 15 + 2
    assert_eq!(completed["metrics"]["pain_reduction_estimate"], 17);
    assert!(completed["achievement"]["title"].is_string());
}

#[test]
fn test_run_journals_outcome() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("run")
        .arg("beginner-pain-relief")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--instant")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session complete"))
        .stdout(predicate::str::contains("Session journaled"));

    let journal_path = data_dir.join("journal/sessions.jsonl");
    let content = fs::read_to_string(&journal_path).expect("Failed to read journal");
    assert_eq!(content.lines().count(), 1);

    let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
    assert_eq!(record["program_id"], "beginner-pain-relief");
    assert_eq!(record["outcome"], "completed");
    assert!(record["achievement"].is_object());
}

#[test]
fn test_no_journal_flag() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("run")
        .arg("arthritis-mobility")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--instant")
        .arg("--no-journal")
        .assert()
        .success();

    assert!(!data_dir.join("journal/sessions.jsonl").exists());
}

#[test]
fn test_stop_after_records_stopped_run() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("run")
        .arg("back-pain-relief")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--instant")
        .arg("--stop-after")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session stopped after 0 exercises"));

    let content = fs::read_to_string(data_dir.join("journal/sessions.jsonl")).unwrap();
    let record: Value = serde_json::from_str(content.trim()).unwrap();
    assert_eq!(record["outcome"], "stopped");
    assert!(record["achievement"].is_null());
    assert_eq!(record["metrics"]["pain_reduction_estimate"], 0);
}

#[test]
fn test_unknown_program_fails() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("run")
        .arg("no-such-program")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--instant")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown program: no-such-program"));

    assert!(!temp_dir.path().join("journal").exists());
}

#[test]
fn test_history_shows_runs() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions in the last 7 days."));

    run_json(&data_dir, "back-pain-relief");

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Back Pain Relief"))
        .stdout(predicate::str::contains("completed"));
}

#[test]
fn test_render_tone_writes_wav() {
    let temp_dir = setup_test_dir();
    let out = temp_dir.path().join("tone.wav");

    cli()
        .arg("render")
        .arg("tone")
        .arg("528Hz")
        .arg("--seconds")
        .arg("2")
        .arg("--sample-rate")
        .arg("8000")
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered"));

    let mut reader = hound::WavReader::open(&out).expect("Failed to open WAV");
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);

    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 2 * 16_000);
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    assert!(peak > 0.0 && peak <= 1.0);
}

#[test]
fn test_render_nature_and_binaural() {
    let temp_dir = setup_test_dir();

    for (source, name) in [("nature", Some("ocean")), ("binaural", None), ("relief", None)] {
        let out = temp_dir.path().join(format!("{}.wav", source));
        let mut cmd = cli();
        cmd.arg("render").arg(source);
        if let Some(name) = name {
            cmd.arg(name);
        }
        cmd.arg("--seconds")
            .arg("1")
            .arg("--sample-rate")
            .arg("8000")
            .arg("--seed")
            .arg("7")
            .arg("--out")
            .arg(&out)
            .assert()
            .success();

        let reader = hound::WavReader::open(&out).expect("Failed to open WAV");
        assert_eq!(reader.len(), 2 * 8000);
    }
}

#[test]
fn test_render_unknown_tone_fails() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("render")
        .arg("tone")
        .arg("440Hz")
        .arg("--seconds")
        .arg("1")
        .arg("--sample-rate")
        .arg("8000")
        .arg("--out")
        .arg(temp_dir.path().join("bad.wav"))
        .assert()
        .failure();
}

#[test]
fn test_history_huge_window_lists_everything() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    run_json(&data_dir, "beginner-pain-relief");

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--days")
        .arg("9223372036854775807")
        .assert()
        .success()
        .stdout(predicate::str::contains("completed"));
}

#[test]
fn test_history_negative_window_is_rejected() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("history")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--days=-1")
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_run_rejects_extreme_speed() {
    let temp_dir = setup_test_dir();

    for speed in ["1e-300", "0", "1e300"] {
        cli()
            .arg("run")
            .arg("beginner-pain-relief")
            .arg("--data-dir")
            .arg(temp_dir.path())
            .arg("--speed")
            .arg(speed)
            .arg("--no-journal")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("--speed must be between"));
    }
}
