use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::IngestionResult;
use crate::ingestion::descriptor::check_local_file;

/// Reads one local file fully into memory.
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The path is re-checked here: it may have changed since the descriptor was built.
    pub fn fetch(&self) -> IngestionResult<Bytes> {
        check_local_file(&self.path)?;
        let bytes = std::fs::read(&self.path)?;
        Ok(Bytes::from(bytes))
    }
}
