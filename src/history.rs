use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::config::HISTORY_STORAGE_KEY;
use crate::error::InterviewError;

/// Summary of one finished session. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub date: DateTime<Utc>,
    pub role: String,
    pub score: f64,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "Completed".to_string()
}

impl AttemptRecord {
    pub fn new(role: impl Into<String>, score: f64, status: impl Into<String>) -> Self {
        Self {
            date: Utc::now(),
            role: role.into(),
            score,
            status: status.into(),
        }
    }
}

/// Append-only attempt list persisted as one JSON array under a fixed key.
pub struct AttemptStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AttemptStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", HISTORY_STORAGE_KEY)),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records oldest-first, as stored. Unreadable data reads as empty.
    pub fn list_stored(&self) -> Vec<AttemptRecord> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read interview history {:?}: {}", self.path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse interview history: {}", e);
                Vec::new()
            }
        }
    }

    /// Records most-recent-first, for display.
    pub fn list(&self) -> Vec<AttemptRecord> {
        let mut records = self.list_stored();
        records.reverse();
        records
    }

    /// Unlike `list_stored`, an unreadable blob is an error here so that
    /// appending never overwrites records it could not parse.
    fn load_for_append(&self) -> Result<Vec<AttemptRecord>, InterviewError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(InterviewError::Persistence(format!("{:?}: {}", self.path, e)));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            warn!("Refusing to append to unparseable interview history: {}", e);
            InterviewError::Persistence(format!("{:?} is not a valid history: {}", self.path, e))
        })
    }

    pub fn append(&self, record: AttemptRecord) -> Result<(), InterviewError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| InterviewError::Persistence("history lock poisoned".to_string()))?;

        let mut history = self.load_for_append()?;
        history.push(record);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| InterviewError::Persistence(format!("{:?}: {}", parent, e)))?;
        }
        let json = serde_json::to_string_pretty(&history)
            .map_err(|e| InterviewError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|e| InterviewError::Persistence(format!("{:?}: {}", self.path, e)))?;

        info!("Saved interview attempt ({} total)", history.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_status_defaults_to_completed() {
        let record: AttemptRecord = serde_json::from_str(
            r#"{"date":"2026-01-05T10:00:00Z","role":"frontend","score":6}"#,
        )
        .unwrap();
        assert_eq!(record.status, "Completed");
        assert_eq!(record.score, 6.0);
    }

    #[test]
    fn test_path_uses_fixed_key() {
        let store = AttemptStore::new(Path::new("/tmp/data"));
        assert_eq!(store.path(), Path::new("/tmp/data/interview_history.json"));
    }
}
