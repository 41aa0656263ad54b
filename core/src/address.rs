//! Addresses
//!
//! An address is a wrapper over the holder's public key.

use rscoin_crypto::{CryptoError, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub PublicKey);

impl Address {
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        Ok(Address(PublicKey::from_hex(hex_str)?))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.0
    }
}

impl From<PublicKey> for Address {
    fn from(pk: PublicKey) -> Self {
        Address(pk)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..16])
    }
}
