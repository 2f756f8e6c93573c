// ABOUTME: Archive format detection and extraction.
// ABOUTME: Only ZIP bundles are accepted; entries are confined to the destination.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use zip::ZipArchive;

use super::StoreError;

/// Local file header and empty-archive signatures.
const ZIP_SIGNATURES: [&[u8; 4]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// Package formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
}

impl ArchiveKind {
    /// Detect the format from an upload's file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.to_ascii_lowercase()
            .ends_with(".zip")
            .then_some(ArchiveKind::Zip)
    }

    /// Detect the format from the first bytes of the content.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        ZIP_SIGNATURES
            .iter()
            .any(|sig| header.starts_with(&sig[..]))
            .then_some(ArchiveKind::Zip)
    }

    /// Detect the format of a file on disk by its content.
    pub fn sniff_file(path: &Path) -> io::Result<Option<Self>> {
        let mut header = [0u8; 4];
        let mut file = File::open(path)?;
        let mut read = 0;
        while read < header.len() {
            match file.read(&mut header[read..])? {
                0 => break,
                n => read += n,
            }
        }
        Ok(Self::sniff(&header[..read]))
    }
}

/// Extract a ZIP archive into `destination`, returning the number of files written.
///
/// Existing files are truncated and rewritten, so extracting twice into the same
/// directory is harmless.
pub fn extract_zip(archive: &Path, destination: &Path) -> Result<usize, StoreError> {
    let extract_err = |source| StoreError::Extract {
        path: destination.to_path_buf(),
        source,
    };

    let file = File::open(archive).map_err(extract_err)?;
    let mut zip = ZipArchive::new(file)?;
    let mut written = 0;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| StoreError::UnsafeEntry(entry.name().to_string()))?;
        let target = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(extract_err)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(extract_err)?;
        }

        let mut out = File::create(&target).map_err(extract_err)?;
        io::copy(&mut entry, &mut out).map_err(extract_err)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777))
                .map_err(extract_err)?;
        }

        written += 1;
    }

    Ok(written)
}
