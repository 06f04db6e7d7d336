//! Content hashing for file bytes and revision documents.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Digest;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Hash digest size in bytes (both supported algorithms produce 256-bit hashes).
pub const HASH_SIZE: usize = 32;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// BLAKE3 with 256-bit output.
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl Algorithm {
    /// Returns the string representation of the algorithm (for config files).
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Blake3 => "blake3-256",
            Algorithm::Sha256 => "sha256",
        }
    }

    /// Parse algorithm from string.
    ///
    /// Accepts the config spelling as well as the short CLI names.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blake3-256" | "blake3" => Ok(Algorithm::Blake3),
            "sha256" | "sha-256" => Ok(Algorithm::Sha256),
            _ => Err(Error::unsupported_algorithm(s)),
        }
    }

    /// Hash raw bytes.
    pub fn hash_bytes(&self, data: &[u8]) -> Hash {
        match self {
            Algorithm::Blake3 => Hash(*blake3::hash(data).as_bytes()),
            Algorithm::Sha256 => Hash(sha2::Sha256::digest(data).into()),
        }
    }

    /// Hash data from a reader.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> Result<Hash> {
        match self {
            Algorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                std::io::copy(&mut reader, &mut hasher)?;
                Ok(Hash(*hasher.finalize().as_bytes()))
            }
            Algorithm::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                std::io::copy(&mut reader, &mut hasher)?;
                Ok(Hash(hasher.finalize().into()))
            }
        }
    }

    /// Hash the contents of a file.
    pub fn hash_file(&self, path: &Path) -> Result<Hash> {
        let file = std::fs::File::open(path)?;
        self.hash_reader(file)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 32-byte digest identifying file content or a revision document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash([u8; HASH_SIZE]);

impl Hash {
    /// Create a Hash from raw bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Hash(bytes)
    }

    /// Create a Hash from a hex string (64 hex characters).
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        if hex_str.len() != HASH_SIZE * 2 {
            return Err(Error::invalid_hash(format!(
                "Expected {} hex characters, got {}",
                HASH_SIZE * 2,
                hex_str.len()
            )));
        }

        let bytes =
            hex::decode(hex_str).map_err(|e| Error::invalid_hash(format!("Invalid hex: {}", e)))?;

        let mut hash = [0u8; HASH_SIZE];
        hash.copy_from_slice(&bytes);
        Ok(Hash(hash))
    }

    /// Convert to hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 12 hex characters, for human-facing listings.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_empty() {
        let hash = Algorithm::Blake3.hash_bytes(b"");
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn test_blake3_hello_world() {
        let hash = Algorithm::Blake3.hash_bytes(b"hello world");

        // BLAKE3 of "hello world"
        assert_eq!(
            hash.to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_sha256_hello_world() {
        let hash = Algorithm::Sha256.hash_bytes(b"hello world");
        assert_eq!(
            hash.to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_algorithms_disagree() {
        let data = b"same input";
        assert_ne!(
            Algorithm::Blake3.hash_bytes(data),
            Algorithm::Sha256.hash_bytes(data)
        );
    }

    #[test]
    fn test_hash_reader_matches_bytes() {
        for algo in [Algorithm::Blake3, Algorithm::Sha256] {
            let data = b"streamed content".repeat(1000);
            let from_reader = algo.hash_reader(&data[..]).unwrap();
            assert_eq!(from_reader, algo.hash_bytes(&data));
        }
    }

    #[test]
    fn test_hash_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("f.txt");
        std::fs::write(&path, b"hello").unwrap();

        let hash = Algorithm::Blake3.hash_file(&path).unwrap();
        assert_eq!(hash, Algorithm::Blake3.hash_bytes(b"hello"));

        assert!(Algorithm::Blake3
            .hash_file(&temp_dir.path().join("missing"))
            .is_err());
    }

    #[test]
    fn test_hash_from_hex_invalid_length() {
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("").is_err());
    }

    #[test]
    fn test_hash_from_hex_invalid_chars() {
        let invalid = "z".repeat(64);
        assert!(Hash::from_hex(&invalid).is_err());
    }

    #[test]
    fn test_hash_short() {
        let hash = Algorithm::Blake3.hash_bytes(b"test");
        assert_eq!(hash.short().len(), 12);
        assert!(hash.to_hex().starts_with(&hash.short()));
    }

    #[test]
    fn test_hash_serde_as_hex_string() {
        let hash = Algorithm::Blake3.hash_bytes(b"serde");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));

        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);

        assert!(serde_json::from_str::<Hash>("\"nothex\"").is_err());
    }

    #[test]
    fn test_algorithm_conversions() {
        assert_eq!(Algorithm::Blake3.as_str(), "blake3-256");
        assert_eq!(Algorithm::Sha256.as_str(), "sha256");

        assert_eq!(Algorithm::parse("blake3-256").unwrap(), Algorithm::Blake3);
        assert_eq!(Algorithm::parse("blake3").unwrap(), Algorithm::Blake3);
        assert_eq!(Algorithm::parse("sha256").unwrap(), Algorithm::Sha256);
        assert_eq!(Algorithm::default(), Algorithm::Blake3);

        assert!(Algorithm::parse("md5").is_err());
    }

    // Property-based tests
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            max_shrink_iters: 10000,
            ..ProptestConfig::default()
        })]

        /// Hashing the same data always produces the same hash
        #[test]
        fn prop_hash_deterministic(data: Vec<u8>) {
            for algo in [Algorithm::Blake3, Algorithm::Sha256] {
                prop_assert_eq!(algo.hash_bytes(&data), algo.hash_bytes(&data));
            }
        }

        /// Round-trip through hex preserves the hash
        #[test]
        fn prop_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
            let hash = Hash::from_bytes(bytes);
            let parsed = Hash::from_hex(&hash.to_hex())?;
            prop_assert_eq!(hash, parsed);
        }

        /// Invalid hex length always fails
        #[test]
        fn prop_invalid_hex_length_fails(
            s in "[0-9a-f]{0,63}|[0-9a-f]{65,128}"
        ) {
            prop_assert!(Hash::from_hex(&s).is_err());
        }
    }
}
