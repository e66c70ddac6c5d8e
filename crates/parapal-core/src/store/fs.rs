use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use uuid::Uuid;

use super::{ResultRecord, ResultStore};
use crate::error::{ParapalError, Result};

/// Filesystem-backed result store.
///
/// Layout: `<root>/results/<id>.json`
pub struct FsResultStore {
    results_dir: PathBuf,
}

impl FsResultStore {
    /// Create a store rooted at `root`. Creates `root/results/` if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let results_dir = root.as_ref().join("results");
        fs::create_dir_all(&results_dir)?;
        Ok(Self { results_dir })
    }

    fn record_path(&self, id: &Uuid) -> PathBuf {
        self.results_dir.join(format!("{id}.json"))
    }

    /// Read back a saved record.
    pub fn load_result(&self, id: &Uuid) -> Result<ResultRecord> {
        let path = self.record_path(id);
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ParapalError::Store(format!("result not found: {id}"))
            } else {
                ParapalError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ResultStore for FsResultStore {
    fn save_result(&self, record: &ResultRecord) -> Result<()> {
        let data = serde_json::to_vec_pretty(record)?;

        // Atomic write: temp file in the same directory, then rename.
        let mut tmp = NamedTempFile::new_in(&self.results_dir)?;
        tmp.write_all(&data)?;
        tmp.persist(self.record_path(&record.id))
            .map_err(|e| e.error)?;

        Ok(())
    }
}
