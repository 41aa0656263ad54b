//! Period-boundary protocol messages between the bank and the mintettes

use crate::block::{HBlock, LBlock};
use crate::{ActionLog, AddressMap, MintetteId, PeriodId, Utxo};
use rscoin_crypto::{PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A mintette's network location. Its position in the bank's roster is its
/// `MintetteId` for the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mintette {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Mintette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Bank-signed list of mintette keys, in roster order.
pub type Dpk = Vec<(PublicKey, Signature)>;

/// What a mintette hands the bank at period end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodResult {
    pub period_id: PeriodId,
    pub lblocks: Vec<LBlock>,
    pub action_log: ActionLog,
}

/// The UTXO slice and address map pushed to a mintette whose ownership
/// assignments changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeriodPayload {
    pub mintette_id: MintetteId,
    #[serde(with = "crate::serde_pairs")]
    pub utxo: Utxo,
    #[serde(with = "crate::serde_pairs")]
    pub addresses: AddressMap,
}

/// What the bank pushes to every mintette to open a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPeriodData {
    pub period_id: PeriodId,
    pub mintettes: Vec<Mintette>,
    pub last_hblock: HBlock,
    pub payload: Option<NewPeriodPayload>,
    pub dpk: Dpk,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::block::HBlock;
    use rscoin_crypto::KeyPair;

    #[test]
    fn test_new_period_data_json_roundtrip() {
        let keypair = KeyPair::generate();
        let npd = NewPeriodData {
            period_id: 3,
            mintettes: vec![Mintette {
                host: "127.0.0.1".to_string(),
                port: 9001,
            }],
            last_hblock: HBlock::genesis(&keypair, Address(keypair.public_key())),
            payload: Some(NewPeriodPayload {
                mintette_id: 0,
                utxo: Utxo::new(),
                addresses: AddressMap::new(),
            }),
            dpk: vec![(
                keypair.public_key(),
                keypair.sign_value(&keypair.public_key()),
            )],
        };

        let json = serde_json::to_string(&npd).unwrap();
        let back: NewPeriodData = serde_json::from_str(&json).unwrap();
        assert_eq!(npd, back);
    }

    #[test]
    fn test_mintette_display() {
        let m = Mintette {
            host: "10.0.0.1".to_string(),
            port: 9000,
        };
        assert_eq!(m.to_string(), "10.0.0.1:9000");
    }
}
