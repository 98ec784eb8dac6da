//! Search outcomes and the JSON-lines log they are collected in.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StatsError;

/// One keyword search as seen by the statistics engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Keyword exactly as searched
    pub keyword: String,
    /// Terminal topic matched the keyword
    pub found: bool,
    /// Search could not proceed
    pub failed: bool,
    /// Topic names from the root to the last visited topic
    pub path: Vec<String>,
    /// Candidate names offered at each expansion step, in step order
    pub steps: Vec<Vec<String>>,
}

impl SearchOutcome {
    /// Number of descents from the root.
    pub fn path_length(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// Append-only JSON-lines log of outcomes, flushed after every entry so an
/// interrupted batch keeps everything written so far.
pub struct OutcomeLog {
    path: PathBuf,
    writer: BufWriter<File>,
    written: usize,
}

impl OutcomeLog {
    /// Create a new log; an existing file is never overwritten.
    pub fn create(path: &Path) -> Result<Self, StatsError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    StatsError::AlreadyExists(path.display().to_string())
                }
                _ => StatsError::Io(e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append one outcome and flush it to disk.
    pub fn append(&mut self, outcome: &SearchOutcome) -> Result<(), StatsError> {
        serde_json::to_writer(&mut self.writer, outcome)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        self.written += 1;
        debug!(keyword = %outcome.keyword, log = %self.path.display(), "Logged outcome");
        Ok(())
    }

    /// Number of outcomes appended through this handle.
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Read every outcome from a JSON-lines log, skipping blank lines.
pub fn read_outcomes(path: &Path) -> Result<Vec<SearchOutcome>, StatsError> {
    let reader = BufReader::new(File::open(path)?);
    let mut outcomes = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let outcome = serde_json::from_str(&line).map_err(|source| StatsError::InvalidLine {
            line: index + 1,
            source,
        })?;
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn outcome(keyword: &str, found: bool) -> SearchOutcome {
        SearchOutcome {
            keyword: keyword.to_string(),
            found,
            failed: false,
            path: vec!["physics".to_string(), "optics".to_string()],
            steps: vec![vec!["optics".to_string(), "acoustics".to_string()]],
        }
    }

    #[test]
    fn test_path_length_excludes_root() {
        assert_eq!(outcome("optics", true).path_length(), 1);
        let mut empty = outcome("x", false);
        empty.path.clear();
        assert_eq!(empty.path_length(), 0);
    }

    #[test]
    fn test_log_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials.jsonl");

        let mut log = OutcomeLog::create(&path).unwrap();
        log.append(&outcome("optics", true)).unwrap();
        log.append(&outcome("Laser", false)).unwrap();
        assert_eq!(log.written(), 2);
        drop(log);

        let outcomes = read_outcomes(&path).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].keyword, "Laser");
        assert!(!outcomes[1].found);
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials.jsonl");
        std::fs::write(&path, "").unwrap();

        let result = OutcomeLog::create(&path);
        assert!(matches!(result, Err(StatsError::AlreadyExists(_))));
    }

    #[test]
    fn test_read_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trials.jsonl");
        let good = serde_json::to_string(&outcome("optics", true)).unwrap();
        std::fs::write(&path, format!("{good}\n\n{{\"keyword\": 3}}\n")).unwrap();

        match read_outcomes(&path) {
            Err(StatsError::InvalidLine { line, .. }) => assert_eq!(line, 3),
            other => panic!("Expected InvalidLine, got {:?}", other.map(|o| o.len())),
        }
    }
}
