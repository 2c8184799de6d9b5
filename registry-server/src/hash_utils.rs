//! Cryptographic hashing utilities for package integrity verification

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Read size used when streaming files through the hasher.
const HASH_CHUNK_SIZE: usize = 128 * 1024;

/// Calculate SHA256 hash of data.
///
/// Computes the SHA256 hash of the provided byte data and returns it as a
/// lowercase hexadecimal string.
///
/// # Examples
///
/// ```
/// # use registry_server::hash_utils::sha256_hash;
/// let data = b"hello world";
/// let hash = sha256_hash(data);
/// assert_eq!(hash.len(), 64); // SHA256 produces 64 hex characters
/// ```
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Calculate the SHA256 hash of a file without loading it into memory.
///
/// The file is read in fixed-size chunks, so the digest covers exactly the
/// bytes a client downloads. This is blocking I/O; async callers should run
/// it on the blocking pool.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash() {
        let data = b"hello world";
        let hash = sha256_hash(data);
        assert_eq!(hash.len(), 64);
        // Known SHA256 hash for "hello world"
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_file_matches_in_memory_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        // Larger than one chunk so the streaming loop runs more than once
        let data: Vec<u8> = (0..(HASH_CHUNK_SIZE * 2 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        std::fs::write(&path, &data).unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_hash(&data));
    }

    #[test]
    fn test_sha256_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sha256_file(&dir.path().join("missing")).is_err());
    }
}
