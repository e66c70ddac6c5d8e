//! Result persistence.
//!
//! Write-only from the grader's point of view: a failed save is logged and
//! never changes the response.

pub mod fs;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::GradeOutcome;
use crate::error::Result;

pub use fs::FsResultStore;

/// One persisted grading result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub student_id: String,
    pub model_id: String,
    pub graded_at: DateTime<Utc>,
    pub outcome: GradeOutcome,
}

impl ResultRecord {
    /// New record with a fresh id, stamped now.
    pub fn new(student_id: &str, model_id: &str, outcome: GradeOutcome) -> Self {
        ResultRecord {
            id: Uuid::new_v4(),
            student_id: student_id.to_string(),
            model_id: model_id.to_string(),
            graded_at: Utc::now(),
            outcome,
        }
    }

    /// Storage key: `results/<id>.json`.
    pub fn key(&self) -> String {
        format!("results/{}.json", self.id)
    }
}

/// Destination for grading results.
pub trait ResultStore: Send + Sync {
    /// Persist `record` under its key, replacing any previous value.
    fn save_result(&self, record: &ResultRecord) -> Result<()>;
}

/// In-memory result store keyed by [`ResultRecord::key`] (testing only).
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: Mutex<HashMap<String, ResultRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<ResultRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryResultStore {
    fn save_result(&self, record: &ResultRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(record.key(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GradeError;

    #[test]
    fn test_record_key_uses_id() {
        let record = ResultRecord::new("s-1", "m", GradeError::new("raw", "bad").into());
        assert_eq!(record.key(), format!("results/{}.json", record.id));
    }

    #[test]
    fn test_memory_store_saves_by_key() {
        let store = MemoryResultStore::new();
        assert!(store.is_empty());

        let record = ResultRecord::new("s-1", "m", GradeError::new("raw", "bad").into());
        store.save_result(&record).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&record.key()), Some(record));
    }
}
