//! Transactions and transaction-output identifiers

use crate::address::Address;
use crate::coin::Coin;
use crate::PeriodId;
use rscoin_crypto::{hash_value, Hash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction has no inputs or no outputs")]
    Empty,

    #[error("Input value {inputs} does not match output value {outputs}")]
    InvalidSum { inputs: Coin, outputs: Coin },

    #[error("Transaction value overflows")]
    Overflow,
}

/// Unique identifier of one transaction output: the producing transaction's
/// hash, the output index within it, and the output value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AddrId {
    pub tx_hash: Hash,
    pub index: u32,
    pub value: Coin,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<AddrId>,
    pub outputs: Vec<(Address, Coin)>,
}

impl Transaction {
    pub fn hash(&self) -> Hash {
        hash_value(self)
    }

    pub fn input_total(&self) -> Option<Coin> {
        Coin::sum(self.inputs.iter().map(|a| a.value))
    }

    pub fn output_total(&self) -> Option<Coin> {
        Coin::sum(self.outputs.iter().map(|(_, c)| *c))
    }

    /// Check the value-conservation invariant: inputs and outputs are
    /// non-empty and their totals match.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(TransactionError::Empty);
        }

        let inputs = self.input_total().ok_or(TransactionError::Overflow)?;
        let outputs = self.output_total().ok_or(TransactionError::Overflow)?;

        if inputs != outputs {
            return Err(TransactionError::InvalidSum { inputs, outputs });
        }

        Ok(())
    }

    /// The addr ids produced by this transaction's outputs.
    pub fn output_addr_ids(&self) -> impl Iterator<Item = (AddrId, Address)> + '_ {
        let tx_hash = self.hash();
        self.outputs
            .iter()
            .enumerate()
            .map(move |(index, (address, value))| {
                (
                    AddrId {
                        tx_hash,
                        index: index as u32,
                        value: *value,
                    },
                    *address,
                )
            })
    }
}

/// Distinguished input hash of the bank emission transaction for a period.
pub fn emission_hash(period_id: PeriodId) -> Hash {
    hash_value(&("rscoin-emission", period_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rscoin_crypto::KeyPair;

    fn addr() -> Address {
        Address(KeyPair::generate().public_key())
    }

    fn addr_id(value: u64) -> AddrId {
        AddrId {
            tx_hash: hash_value(&value),
            index: 0,
            value: Coin::from_units(value),
        }
    }

    #[test]
    fn test_validate_balanced() {
        let tx = Transaction {
            inputs: vec![addr_id(10)],
            outputs: vec![(addr(), Coin::from_units(4)), (addr(), Coin::from_units(6))],
        };
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_validate_unbalanced() {
        let tx = Transaction {
            inputs: vec![addr_id(10)],
            outputs: vec![(addr(), Coin::from_units(9))],
        };
        assert_eq!(
            tx.validate(),
            Err(TransactionError::InvalidSum {
                inputs: Coin::from_units(10),
                outputs: Coin::from_units(9),
            })
        );
    }

    #[test]
    fn test_validate_empty() {
        let tx = Transaction {
            inputs: vec![],
            outputs: vec![(addr(), Coin::from_units(1))],
        };
        assert_eq!(tx.validate(), Err(TransactionError::Empty));
    }

    #[test]
    fn test_output_addr_ids_point_at_tx_hash() {
        let tx = Transaction {
            inputs: vec![addr_id(5)],
            outputs: vec![(addr(), Coin::from_units(2)), (addr(), Coin::from_units(3))],
        };

        let ids: Vec<_> = tx.output_addr_ids().collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].0.tx_hash, tx.hash());
        assert_eq!(ids[1].0.index, 1);
        assert_eq!(ids[1].0.value, Coin::from_units(3));
    }

    #[test]
    fn test_emission_hash_distinct_per_period() {
        assert_ne!(emission_hash(0), emission_hash(1));
        assert_eq!(emission_hash(3), emission_hash(3));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let tx = Transaction {
            inputs: vec![addr_id(10)],
            outputs: vec![(addr(), Coin::from_units(10))],
        };

        let bytes = bincode::serialize(&tx).unwrap();
        let back: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(tx, back);
        assert_eq!(tx.hash(), back.hash());
    }
}
