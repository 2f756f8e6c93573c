// ABOUTME: Content identifier for uploaded artifacts.
// ABOUTME: Streams bytes through SHA-256 in fixed-size chunks to derive a fingerprint.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::types::Fingerprint;

/// Read size used while hashing. Memory use is bounded by this, not the input size.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Compute the fingerprint of everything readable from `reader`.
pub fn fingerprint(mut reader: impl Read) -> io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }

    Ok(Fingerprint::from_digest(&hasher.finalize()))
}

/// Fingerprint a file on the blocking pool.
pub async fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint(File::open(&path)?))
        .await
        .map_err(io::Error::other)?
}
