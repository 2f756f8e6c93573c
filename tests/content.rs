// ABOUTME: Property tests for artifact fingerprinting.
// ABOUTME: Fingerprints must depend on the bytes only, never on how they are read.

use bitswan_gitops::content::{self, CHUNK_SIZE};
use proptest::prelude::*;
use sha2::{Digest, Sha256};
use std::io::{self, Read};

/// Reader that hands out at most `step` bytes per call.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

proptest! {
    #[test]
    fn fingerprint_is_sha256_hex(data in proptest::collection::vec(any::<u8>(), 0..4 * CHUNK_SIZE)) {
        let fp = content::fingerprint(&data[..]).unwrap();
        let expected: String = Sha256::digest(&data).iter().map(|b| format!("{b:02x}")).collect();
        prop_assert_eq!(fp.as_str(), expected.as_str());
    }

    #[test]
    fn fingerprint_ignores_read_boundaries(
        data in proptest::collection::vec(any::<u8>(), 0..3 * CHUNK_SIZE),
        step in 1usize..CHUNK_SIZE,
    ) {
        let whole = content::fingerprint(&data[..]).unwrap();
        let trickled = content::fingerprint(Trickle { data: &data, step }).unwrap();
        prop_assert_eq!(whole, trickled);
    }
}

#[test]
fn different_content_different_fingerprint() {
    let a = content::fingerprint(&b"bundle-a"[..]).unwrap();
    let b = content::fingerprint(&b"bundle-b"[..]).unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn file_fingerprint_matches_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.zip");
    let data = vec![7u8; CHUNK_SIZE * 2 + 13];
    std::fs::write(&path, &data).unwrap();

    assert_eq!(
        content::fingerprint_file(&path).await.unwrap(),
        content::fingerprint(&data[..]).unwrap()
    );
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = content::fingerprint_file(&dir.path().join("absent.zip"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}
