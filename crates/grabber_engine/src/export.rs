use std::fs;
use std::path::{Path, PathBuf};

use grabber_core::ChangeSet;

use crate::filename::changes_filename;
use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("changes record could not be encoded or parsed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Writes finished change sets as `<depot>_changes.json` into an output directory.
#[derive(Debug, Clone)]
pub struct ChangesExporter {
    writer: AtomicFileWriter,
}

impl ChangesExporter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.writer.dir()
    }

    pub fn write(&self, changes: &ChangeSet) -> Result<PathBuf, ExportError> {
        let body = changes.to_json()?;
        let path = self
            .writer
            .write(&changes_filename(&changes.depot_id), &body)?;
        Ok(path)
    }
}

/// Read a changes file back, as the update tooling downstream does.
pub fn load_changes(path: &Path) -> Result<ChangeSet, ExportError> {
    let text = fs::read_to_string(path)?;
    Ok(ChangeSet::from_json(&text)?)
}
