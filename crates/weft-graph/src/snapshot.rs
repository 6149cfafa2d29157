use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{GraphError, GraphResult};

/// One stored value. Tombstones are kept as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub path: String,
    pub value: Value,
}

/// A replica's full contents in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl GraphSnapshot {
    /// Write the snapshot as JSON, atomically replacing `file`.
    pub fn save(&self, file: &Path) -> GraphResult<()> {
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir)?;
        let tmp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, self)
                .map_err(|e| GraphError::Serialization(e.to_string()))?;
            writer.flush()?;
        }
        tmp.persist(file).map_err(|e| GraphError::Io(e.error))?;
        debug!(file = %file.display(), entries = self.entries.len(), "snapshot saved");
        Ok(())
    }

    /// Read a snapshot written by [`GraphSnapshot::save`].
    pub fn load(file: &Path) -> GraphResult<Self> {
        let reader = BufReader::new(fs::File::open(file)?);
        let snapshot: Self = serde_json::from_reader(reader)
            .map_err(|e| GraphError::Serialization(e.to_string()))?;
        debug!(file = %file.display(), entries = snapshot.entries.len(), "snapshot loaded");
        Ok(snapshot)
    }
}
