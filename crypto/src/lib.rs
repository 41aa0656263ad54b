//! RSCoin Cryptography
//!
//! Keypairs, signatures and 256-bit digests over the canonical binary
//! encoding shared by hashing, signing and the wire format.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Bad signature")]
    BadSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,
}

/// Canonical byte encoding used for both hashing and signing.
///
/// Field order is fixed by the type definition, integers are fixed-width,
/// variable-length data is length-prefixed.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    bincode::serialize(value).expect("canonical serialization of in-memory value")
}

/// 256-bit digest of a canonical serialization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The all-zero digest, used as the chain origin.
    pub fn zero() -> Self {
        Hash([0u8; 32])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(&self.0[..8]))
    }
}

/// Hash raw bytes with SHA-256.
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Hash a value over its canonical serialization.
pub fn hash_value<T: Serialize>(value: &T) -> Hash {
    hash_bytes(&canonical_bytes(value))
}

/// Hash two digests into their parent node.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left.0);
    hasher.update(right.0);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidPublicKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(PublicKey(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a value's canonical serialization.
    pub fn verify_value<T: Serialize>(
        &self,
        value: &T,
        signature: &Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig_array: [u8; 64] = signature
            .0
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::BadSignature)?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_array);

        verifying_key
            .verify(&canonical_bytes(value), &sig)
            .map_err(|_| CryptoError::BadSignature)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..8]))
    }
}

/// Detached Ed25519 signature over a value's canonical serialization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..self.0.len().min(8)]))
    }
}

/// Key pair for signing protocol messages
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate new random keypair
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Create keypair from secret key hex
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidSecretKey)?;
        let key_bytes: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidSecretKey)?;

        let signing_key = SigningKey::from_bytes(&key_bytes);
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.verifying_key.to_bytes())
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign a value over its canonical serialization
    pub fn sign_value<T: Serialize>(&self, value: &T) -> Signature {
        let sig = self.signing_key.sign(&canonical_bytes(value));
        Signature(sig.to_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let keypair = KeyPair::generate();
        let message = ("transfer".to_string(), 42u64);

        let sig = keypair.sign_value(&message);
        assert!(keypair.public_key().verify_value(&message, &sig).is_ok());
    }

    #[test]
    fn test_tampered_message_rejected() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign_value(&("transfer".to_string(), 42u64));

        let err = keypair
            .public_key()
            .verify_value(&("transfer".to_string(), 43u64), &sig)
            .unwrap_err();
        assert_eq!(err, CryptoError::BadSignature);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let keypair = KeyPair::generate();
        let other = KeyPair::generate();
        let message = 7u32;

        let sig = keypair.sign_value(&message);
        assert_eq!(
            other.public_key().verify_value(&message, &sig),
            Err(CryptoError::BadSignature)
        );
    }

    #[test]
    fn test_secret_hex_roundtrip() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_secret_hex(&keypair.secret_hex()).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn test_hash_is_stable() {
        let value = (1u64, "abc".to_string());
        assert_eq!(hash_value(&value), hash_value(&value));
        assert_ne!(hash_value(&value), hash_value(&(2u64, "abc".to_string())));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign_value(&1u8);
        let truncated = Signature(sig.0[..32].to_vec());
        assert_eq!(
            keypair.public_key().verify_value(&1u8, &truncated),
            Err(CryptoError::BadSignature)
        );
    }
}
