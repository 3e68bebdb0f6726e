//! Session journal.
//!
//! Finished and stopped runs are appended to a JSONL (JSON Lines) file with
//! file locking so several processes can record into the same journal.

use crate::{Achievement, Error, Result, RunId, SessionMetrics, SessionProgram};
use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// How a run ended
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
}

/// One journaled run
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub run_id: RunId,
    pub program_id: String,
    pub program_name: String,
    pub outcome: RunOutcome,
    pub recorded_at: DateTime<Utc>,
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub achievement: Option<Achievement>,
}

impl SessionRecord {
    pub fn completed(
        run_id: RunId,
        program: &SessionProgram,
        metrics: SessionMetrics,
        achievement: Achievement,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            program_id: program.id.clone(),
            program_name: program.name.clone(),
            outcome: RunOutcome::Completed,
            recorded_at: Utc::now(),
            metrics,
            achievement: Some(achievement),
        }
    }

    pub fn stopped(run_id: RunId, program: &SessionProgram, metrics: SessionMetrics) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            program_id: program.id.clone(),
            program_name: program.name.clone(),
            outcome: RunOutcome::Stopped,
            recorded_at: Utc::now(),
            metrics,
            achievement: None,
        }
    }
}

/// Destination for journaled runs
pub trait RecordSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

/// JSONL journal with file locking
pub struct JsonlJournal {
    path: PathBuf,
}

impl JsonlJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl RecordSink for JsonlJournal {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        // One write per record so concurrent appenders never interleave
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut writer = std::io::BufWriter::new(&file);
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Journaled run {} ({:?})", record.run_id, record.outcome);
        Ok(())
    }
}

/// Read every record from a journal file
///
/// Lines that fail to parse are skipped with a warning.
pub fn read_records(path: &Path) -> Result<Vec<SessionRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping journal line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} records from journal", records.len());
    Ok(records)
}

/// Records from the last `days` days, newest first.
///
/// A window reaching past the representable calendar keeps every record.
pub fn load_recent_records(path: &Path, days: i64) -> Result<Vec<SessionRecord>> {
    if days < 0 {
        return Err(Error::Config(format!("history window must not be negative, got {}", days)));
    }
    let cutoff = Duration::try_days(days).and_then(|window| Utc::now().checked_sub_signed(window));
    let mut records: Vec<_> = read_records(path)?
        .into_iter()
        .filter(|r| cutoff.map_or(true, |cutoff| r.recorded_at >= cutoff))
        .collect();
    records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use crate::AchievementTier;

    fn program() -> SessionProgram {
        build_default_catalog()
            .program("back-pain-relief")
            .cloned()
            .unwrap()
    }

    fn metrics() -> SessionMetrics {
        SessionMetrics {
            start_time_ms: 0,
            end_time_ms: Some(1_260_000),
            total_duration_ms: 1_260_000,
            exercises_completed: 3,
            calories_estimate: 12.5,
            pain_reduction_estimate: 17,
        }
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("journal").join("sessions.jsonl");

        let record = SessionRecord::completed(
            RunId::new(),
            &program(),
            metrics(),
            AchievementTier::PainWarrior.achievement(),
        );

        let mut journal = JsonlJournal::new(&path);
        journal.append(&record).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records, vec![record]);
        assert_eq!(records[0].outcome, RunOutcome::Completed);
    }

    #[test]
    fn test_append_multiple_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");
        let mut journal = JsonlJournal::new(&path);

        for _ in 0..5 {
            let record = SessionRecord::stopped(RunId::new(), &program(), metrics());
            journal.append(&record).unwrap();
        }

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.achievement.is_none()));
    }

    #[test]
    fn test_read_missing_journal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("nope.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");
        let mut journal = JsonlJournal::new(&path);

        journal
            .append(&SessionRecord::stopped(RunId::new(), &program(), metrics()))
            .unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{\"id\": \"truncated").unwrap();
            writeln!(file).unwrap();
        }
        journal
            .append(&SessionRecord::stopped(RunId::new(), &program(), metrics()))
            .unwrap();

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_recent_records_window_and_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");
        let mut journal = JsonlJournal::new(&path);

        let mut old = SessionRecord::stopped(RunId::new(), &program(), metrics());
        old.recorded_at = Utc::now() - Duration::days(30);
        let mut yesterday = SessionRecord::stopped(RunId::new(), &program(), metrics());
        yesterday.recorded_at = Utc::now() - Duration::days(1);
        let today = SessionRecord::stopped(RunId::new(), &program(), metrics());

        for record in [&yesterday, &old, &today] {
            journal.append(record).unwrap();
        }

        let recent = load_recent_records(&path, 7).unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![today.id, yesterday.id]);
    }

    #[test]
    fn test_huge_window_keeps_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");
        let mut journal = JsonlJournal::new(&path);

        let mut ancient = SessionRecord::stopped(RunId::new(), &program(), metrics());
        ancient.recorded_at = Utc::now() - Duration::days(3650);
        journal.append(&ancient).unwrap();
        journal
            .append(&SessionRecord::stopped(RunId::new(), &program(), metrics()))
            .unwrap();

        assert_eq!(load_recent_records(&path, i64::MAX).unwrap().len(), 2);
        assert_eq!(load_recent_records(&path, 1_000_000_000).unwrap().len(), 2);
    }

    #[test]
    fn test_negative_window_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("sessions.jsonl");

        assert!(matches!(load_recent_records(&path, -1), Err(Error::Config(_))));
    }
}
