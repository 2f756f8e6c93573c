// ABOUTME: Error types for the artifact store.
// ABOUTME: Covers archive validation, extraction, and directory management failures.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The upload is not an archive format we can install.
    #[error("unsupported archive: {0}")]
    UnsupportedArchive(String),

    /// The archive could not be read.
    #[error("corrupt archive: {0}")]
    CorruptArchive(#[from] zip::result::ZipError),

    /// An entry would be written outside the artifact directory.
    #[error("archive entry escapes the artifact directory: {0}")]
    UnsafeEntry(String),

    #[error("failed to prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to extract into {path}: {source}")]
    Extract {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move artifact into {path}: {source}")]
    Publish {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        source: std::io::Error,
    },
}
