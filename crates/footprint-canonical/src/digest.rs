use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::encoder::encode;
use crate::errors::EncodeError;
use crate::resolver::Encodable;

/// Supported digest algorithms for footprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlg {
    /// SHA-256.
    #[serde(rename = "sha-256")]
    Sha256,
}

/// Algorithm + bytes digest, serialized as base64url without padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Digest {
    /// Digest algorithm (currently always `sha-256`).
    pub alg: DigestAlg,
    /// Raw digest bytes.
    #[serde(rename = "b64", with = "b64_bytes")]
    pub bytes: [u8; 32],
}

impl Digest {
    /// Lowercase hex rendering.
    pub fn hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Base64url rendering without padding.
    pub fn b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.bytes)
    }
}

/// SHA-256 of raw bytes (usually a footprint).
pub fn hash_bytes(bytes: &[u8]) -> Digest {
    Digest {
        alg: DigestAlg::Sha256,
        bytes: Sha256::digest(bytes).into(),
    }
}

/// Hex SHA-256 of raw bytes.
pub fn hash_hex_from_bytes(bytes: &[u8]) -> String {
    hash_bytes(bytes).hex()
}

/// Encodes `input` and hashes its footprint.
pub fn hash_object<T: Encodable + ?Sized>(input: &T) -> Result<Digest, EncodeError> {
    Ok(hash_bytes(&encode(input)?))
}

/// Hex SHA-256 of the footprint of `input`.
pub fn hash_hex_from_object<T: Encodable + ?Sized>(input: &T) -> Result<String, EncodeError> {
    Ok(hash_object(input)?.hex())
}

mod b64_bytes {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let text = String::deserialize(deserializer)?;
        let raw = URL_SAFE_NO_PAD.decode(text.as_bytes()).map_err(D::Error::custom)?;
        <[u8; 32]>::try_from(raw.as_slice())
            .map_err(|_| D::Error::custom(format!("expected 32 digest bytes, got {}", raw.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_sha256() {
        assert_eq!(
            hash_hex_from_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn object_hash_is_hash_of_footprint() {
        let footprint = encode(&vec![1, 2, 3]).unwrap();
        assert_eq!(
            hash_object(&vec![1, 2, 3]).unwrap(),
            hash_bytes(&footprint)
        );
        assert_ne!(
            hash_hex_from_object(&1).unwrap(),
            hash_hex_from_object(&1.0).unwrap()
        );
    }

    #[test]
    fn digest_serializes_as_b64() {
        let digest = hash_bytes(b"abc");
        let json = serde_json::to_value(digest).unwrap();
        assert_eq!(json["alg"], "sha-256");
        assert_eq!(json["b64"], digest.b64());
        let back: Digest = serde_json::from_value(json).unwrap();
        assert_eq!(back, digest);
    }
}
