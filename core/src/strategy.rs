//! Spend strategies
//!
//! The policy a mintette enforces before tentatively spending an output.

use crate::address::Address;
use crate::transaction::Transaction;
use rscoin_crypto::{PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStrategy {
    /// A signature by the owning address suffices.
    Default,
    /// At least `m` valid signatures from distinct listed keys.
    MOfN { m: usize, keys: Vec<PublicKey> },
}

impl TxStrategy {
    /// Whether `signatures` authorize `tx` to spend an output owned by
    /// `owner` under this strategy.
    pub fn satisfied_by(
        &self,
        owner: &Address,
        tx: &Transaction,
        signatures: &[(Address, Signature)],
    ) -> bool {
        match self {
            TxStrategy::Default => signatures.iter().any(|(address, sig)| {
                address == owner && address.public_key().verify_value(tx, sig).is_ok()
            }),
            TxStrategy::MOfN { m, keys } => {
                let allowed: BTreeSet<&PublicKey> = keys.iter().collect();
                let mut signers = BTreeSet::new();
                for (address, sig) in signatures {
                    let pk = address.public_key();
                    if allowed.contains(pk) && pk.verify_value(tx, sig).is_ok() {
                        signers.insert(*pk);
                    }
                }
                signers.len() >= *m
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;
    use crate::transaction::AddrId;
    use rscoin_crypto::{hash_value, KeyPair};

    fn sample_tx(owner: &Address) -> Transaction {
        Transaction {
            inputs: vec![AddrId {
                tx_hash: hash_value(&1u64),
                index: 0,
                value: Coin::from_units(5),
            }],
            outputs: vec![(*owner, Coin::from_units(5))],
        }
    }

    #[test]
    fn test_default_strategy() {
        let keypair = KeyPair::generate();
        let owner = Address(keypair.public_key());
        let tx = sample_tx(&owner);

        let sigs = vec![(owner, keypair.sign_value(&tx))];
        assert!(TxStrategy::Default.satisfied_by(&owner, &tx, &sigs));
        assert!(!TxStrategy::Default.satisfied_by(&owner, &tx, &[]));
    }

    #[test]
    fn test_default_strategy_rejects_foreign_signer() {
        let keypair = KeyPair::generate();
        let outsider = KeyPair::generate();
        let owner = Address(keypair.public_key());
        let tx = sample_tx(&owner);

        let sigs = vec![(Address(outsider.public_key()), outsider.sign_value(&tx))];
        assert!(!TxStrategy::Default.satisfied_by(&owner, &tx, &sigs));
    }

    #[test]
    fn test_m_of_n_strategy() {
        let holders: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let owner = Address(holders[0].public_key());
        let tx = sample_tx(&owner);

        let strategy = TxStrategy::MOfN {
            m: 2,
            keys: holders.iter().map(|k| k.public_key()).collect(),
        };

        let one = vec![(Address(holders[0].public_key()), holders[0].sign_value(&tx))];
        assert!(!strategy.satisfied_by(&owner, &tx, &one));

        let two = vec![
            (Address(holders[0].public_key()), holders[0].sign_value(&tx)),
            (Address(holders[2].public_key()), holders[2].sign_value(&tx)),
        ];
        assert!(strategy.satisfied_by(&owner, &tx, &two));
    }

    #[test]
    fn test_m_of_n_counts_distinct_signers() {
        let holders: Vec<KeyPair> = (0..2).map(|_| KeyPair::generate()).collect();
        let owner = Address(holders[0].public_key());
        let tx = sample_tx(&owner);

        let strategy = TxStrategy::MOfN {
            m: 2,
            keys: holders.iter().map(|k| k.public_key()).collect(),
        };

        // The same key twice is one signer.
        let dup = vec![
            (Address(holders[0].public_key()), holders[0].sign_value(&tx)),
            (Address(holders[0].public_key()), holders[0].sign_value(&tx)),
        ];
        assert!(!strategy.satisfied_by(&owner, &tx, &dup));
    }
}
