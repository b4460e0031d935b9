//! Artifact integrity verification.
//!
//! A file is intact only if both its size and its content digest match the
//! catalog record. Files are hashed in fixed 4 KiB chunks so verification of
//! large artifacts runs in constant memory.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::catalog::VersionRecord;

/// Read size used while hashing (4 KiB).
const CHUNK_SIZE: usize = 4 * 1024;

/// Digest algorithms the catalog may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Infer the algorithm from a hex digest's length.
    pub fn detect(expected: &str) -> Option<Self> {
        let hex = expected.trim();
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            40 => Some(Self::Sha1),
            64 => Some(Self::Sha256),
            _ => None,
        }
    }
}

fn digest_file<D: Digest>(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = D::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

/// Calculate the lowercase hex digest of a file.
pub fn checksum_file(path: &Path, algorithm: ChecksumAlgorithm) -> io::Result<String> {
    match algorithm {
        ChecksumAlgorithm::Sha1 => digest_file::<Sha1>(path),
        ChecksumAlgorithm::Sha256 => digest_file::<Sha256>(path),
    }
}

/// Check that `path` has exactly `expected_size` bytes and hashes to
/// `expected_checksum`.
///
/// Missing or unreadable files, and checksums in an unknown format, fail
/// verification; this function never errors.
pub fn verify(path: &Path, expected_size: u64, expected_checksum: &str) -> bool {
    let Ok(metadata) = path.metadata() else {
        return false;
    };
    if !metadata.is_file() || metadata.len() != expected_size {
        return false;
    }

    let Some(algorithm) = ChecksumAlgorithm::detect(expected_checksum) else {
        return false;
    };

    match checksum_file(path, algorithm) {
        Ok(actual) => actual.eq_ignore_ascii_case(expected_checksum.trim()),
        Err(_) => false,
    }
}

/// [`verify`] against a catalog record.
pub fn verify_record(path: &Path, record: &VersionRecord) -> bool {
    verify(path, record.size, &record.sha1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn hello_file(temp: &TempDir) -> std::path::PathBuf {
        let path = temp.path().join("test.jar");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();
        path
    }

    #[test]
    fn test_detect_algorithm() {
        assert_eq!(ChecksumAlgorithm::detect(HELLO_SHA1), Some(ChecksumAlgorithm::Sha1));
        assert_eq!(
            ChecksumAlgorithm::detect(HELLO_SHA256),
            Some(ChecksumAlgorithm::Sha256)
        );
        assert_eq!(ChecksumAlgorithm::detect(""), None);
        assert_eq!(ChecksumAlgorithm::detect("abc"), None);
        assert_eq!(
            ChecksumAlgorithm::detect("zzae6c35c94fcfb415dbe95f408b9ce91ee846ed"),
            None
        );
    }

    #[test]
    fn test_checksum_file_sha1() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert_eq!(
            checksum_file(&path, ChecksumAlgorithm::Sha1).unwrap(),
            HELLO_SHA1
        );
    }

    #[test]
    fn test_checksum_file_sha256() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert_eq!(
            checksum_file(&path, ChecksumAlgorithm::Sha256).unwrap(),
            HELLO_SHA256
        );
    }

    #[test]
    fn test_verify_match() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert!(verify(&path, 11, HELLO_SHA1));
        assert!(verify(&path, 11, HELLO_SHA256));
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert!(verify(&path, 11, &HELLO_SHA1.to_uppercase()));
    }

    #[test]
    fn test_verify_size_mismatch() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert!(!verify(&path, 12, HELLO_SHA1));
    }

    #[test]
    fn test_verify_same_size_different_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.jar");
        fs::write(&path, b"hello wOrld").unwrap();

        // Size alone is not enough
        assert!(!verify(&path, 11, HELLO_SHA1));
    }

    #[test]
    fn test_verify_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(!verify(&temp.path().join("nope.jar"), 11, HELLO_SHA1));
    }

    #[test]
    fn test_verify_directory_fails() {
        let temp = TempDir::new().unwrap();
        assert!(!verify(temp.path(), 0, HELLO_SHA1));
    }

    #[test]
    fn test_verify_unknown_checksum_format_fails() {
        let temp = TempDir::new().unwrap();
        let path = hello_file(&temp);
        assert!(!verify(&path, 11, ""));
    }

    #[test]
    fn test_large_file_spans_many_chunks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.bin");
        fs::write(&path, vec![0xABu8; 100_000]).unwrap();

        let first = checksum_file(&path, ChecksumAlgorithm::Sha1).unwrap();
        let second = checksum_file(&path, ChecksumAlgorithm::Sha1).unwrap();
        assert_eq!(first, second);
        assert!(verify(&path, 100_000, &first));
    }
}
