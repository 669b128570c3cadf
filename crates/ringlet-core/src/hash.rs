use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Hash algorithms usable for identity hashes, metadata and resource-id derivation.
///
/// Codes follow the TLS hash algorithm registry; BLAKE3 sits in its private-use range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    None,
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Sha256 => 4,
            Self::Blake3 => 224,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Self::None),
            4 => Ok(Self::Sha256),
            224 => Ok(Self::Blake3),
            other => Err(CoreError::UnsupportedHash(other)),
        }
    }

    /// Digest length in bytes (zero for `None`).
    pub const fn output_len(self) -> usize {
        match self {
            Self::None => 0,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }

    pub fn digest(self, input: &[u8]) -> Vec<u8> {
        self.digest_parts(&[input])
    }

    /// Hashes the concatenation of `parts` without building it first.
    pub fn digest_parts(self, parts: &[&[u8]]) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().to_vec()
            }
            Self::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                for part in parts {
                    hasher.update(part);
                }
                hasher.finalize().as_bytes().to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HashAlgorithm;

    #[test]
    fn hash_is_deterministic() {
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            assert_eq!(alg.digest(b"ringlet"), alg.digest(b"ringlet"));
            assert_eq!(alg.digest(b"ringlet").len(), alg.output_len());
        }
    }

    #[test]
    fn hash_changes_when_input_changes() {
        assert_ne!(
            HashAlgorithm::Sha256.digest(b"ring-a"),
            HashAlgorithm::Sha256.digest(b"ring-b")
        );
    }

    #[test]
    fn parts_hash_like_concatenation() {
        let alg = HashAlgorithm::Sha256;
        assert_eq!(alg.digest_parts(&[b"cert", b"node"]), alg.digest(b"certnode"));
    }

    #[test]
    fn sha256_matches_known_vector() {
        let digest = HashAlgorithm::Sha256.digest(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn codes_round_trip_and_reject_unknown() {
        for alg in [HashAlgorithm::None, HashAlgorithm::Sha256, HashAlgorithm::Blake3] {
            assert_eq!(HashAlgorithm::from_code(alg.code()), Ok(alg));
        }
        assert!(HashAlgorithm::from_code(2).is_err());
        assert!(HashAlgorithm::None.digest(b"x").is_empty());
    }
}
