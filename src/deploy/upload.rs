// ABOUTME: Uploaded archive buffered in a temporary file.
// ABOUTME: Rejects anything that is not a ZIP before it reaches the pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::store::ArchiveKind;

use super::DeployError;

/// An accepted upload. The temporary file is deleted when this is dropped.
#[derive(Debug)]
pub struct Upload {
    file: NamedTempFile,
}

impl Upload {
    /// Accept an upload received in memory under `file_name`.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Result<Self, DeployError> {
        if ArchiveKind::from_file_name(file_name).is_none() || ArchiveKind::sniff(bytes).is_none() {
            return Err(DeployError::InvalidArchive);
        }

        let mut file = NamedTempFile::new().map_err(DeployError::Upload)?;
        file.write_all(bytes).map_err(DeployError::Upload)?;
        file.flush().map_err(DeployError::Upload)?;
        Ok(Self { file })
    }

    /// Accept an archive already on disk. The file is copied, so the caller keeps
    /// ownership of `path`.
    pub async fn from_path(path: &Path) -> Result<Self, DeployError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(DeployError::InvalidArchive)?;
        if ArchiveKind::from_file_name(name).is_none() {
            return Err(DeployError::InvalidArchive);
        }

        let source: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            match ArchiveKind::sniff_file(&source).map_err(DeployError::Upload)? {
                Some(ArchiveKind::Zip) => {}
                None => return Err(DeployError::InvalidArchive),
            }
            let file = NamedTempFile::new().map_err(DeployError::Upload)?;
            std::fs::copy(&source, file.path()).map_err(DeployError::Upload)?;
            Ok(Self { file })
        })
        .await?
    }

    /// Location of the buffered archive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
