//! Local and higher-level blocks

use crate::address::Address;
use crate::coin::Coin;
use crate::constants::GENESIS_VALUE;
use crate::transaction::{AddrId, Transaction};
use crate::AddressMap;
use rscoin_crypto::{hash_pair, hash_value, CryptoError, Hash, KeyPair, PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// Merkle root over the transaction hashes. An odd level duplicates its last
/// node; an empty list roots at zero.
pub fn merkle_root(transactions: &[Transaction]) -> Hash {
    if transactions.is_empty() {
        return Hash::zero();
    }

    let mut level: Vec<Hash> = transactions.iter().map(|tx| tx.hash()).collect();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(*level.last().expect("level is non-empty"));
        }
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Mintette-local block sealing one epoch of committed transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LBlock {
    pub prev_hblock_hash: Hash,
    pub transactions: Vec<Transaction>,
    pub signature: Signature,
    /// Action-log head at the moment of sealing.
    pub log_head: Hash,
}

impl LBlock {
    pub fn seal(
        keypair: &KeyPair,
        prev_hblock_hash: Hash,
        transactions: Vec<Transaction>,
        log_head: Hash,
    ) -> Self {
        let signature = keypair.sign_value(&(&prev_hblock_hash, &transactions, &log_head));
        LBlock {
            prev_hblock_hash,
            transactions,
            signature,
            log_head,
        }
    }

    fn body(&self) -> (&Hash, &Vec<Transaction>, &Hash) {
        (&self.prev_hblock_hash, &self.transactions, &self.log_head)
    }

    pub fn hash(&self) -> Hash {
        hash_value(&self.body())
    }

    pub fn verify(&self, key: &PublicKey) -> Result<(), CryptoError> {
        key.verify_value(&self.body(), &self.signature)
    }
}

/// Bank-signed period-final block forming the canonical chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HBlock {
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub transactions: Vec<Transaction>,
    pub signature: Signature,
    /// Address-strategy map carried as of this period.
    #[serde(with = "crate::serde_pairs")]
    pub addresses: AddressMap,
}

impl HBlock {
    pub fn create(
        keypair: &KeyPair,
        prev_hash: Hash,
        transactions: Vec<Transaction>,
        addresses: AddressMap,
    ) -> Self {
        let merkle_root = merkle_root(&transactions);
        let signature = keypair.sign_value(&(&prev_hash, &merkle_root));
        HBlock {
            prev_hash,
            merkle_root,
            transactions,
            signature,
            addresses,
        }
    }

    /// The period-0 block: no prior block, no emission, the initial supply
    /// granted to the bank address.
    pub fn genesis(keypair: &KeyPair, bank_address: Address) -> Self {
        let grant = Transaction {
            inputs: vec![AddrId {
                tx_hash: Hash::zero(),
                index: 0,
                value: Coin::from_units(GENESIS_VALUE),
            }],
            outputs: vec![(bank_address, Coin::from_units(GENESIS_VALUE))],
        };
        Self::create(keypair, Hash::zero(), vec![grant], AddressMap::new())
    }

    pub fn hash(&self) -> Hash {
        hash_value(&(&self.prev_hash, &self.merkle_root))
    }

    /// Authenticity check: bank signature over the header, Merkle root
    /// matching the carried transactions.
    pub fn verify(&self, bank_key: &PublicKey) -> Result<(), CryptoError> {
        bank_key.verify_value(&(&self.prev_hash, &self.merkle_root), &self.signature)?;
        if merkle_root(&self.transactions) != self.merkle_root {
            return Err(CryptoError::BadSignature);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rscoin_crypto::hash_bytes;

    fn tx(seed: u64) -> Transaction {
        Transaction {
            inputs: vec![AddrId {
                tx_hash: hash_value(&seed),
                index: 0,
                value: Coin::from_units(seed),
            }],
            outputs: vec![(
                Address(KeyPair::generate().public_key()),
                Coin::from_units(seed),
            )],
        }
    }

    #[test]
    fn test_merkle_root_depends_on_contents() {
        let a = [tx(1), tx(2), tx(3)];
        let b = [tx(1), tx(2), tx(4)];

        assert_eq!(merkle_root(&a), merkle_root(&a));
        assert_ne!(merkle_root(&a), merkle_root(&b));
        assert!(merkle_root(&[]).is_zero());
    }

    #[test]
    fn test_lblock_seal_and_verify() {
        let keypair = KeyPair::generate();
        let block = LBlock::seal(
            &keypair,
            hash_bytes(b"prev"),
            vec![tx(1), tx(2)],
            hash_bytes(b"head"),
        );

        assert!(block.verify(&keypair.public_key()).is_ok());
        assert!(block.verify(&KeyPair::generate().public_key()).is_err());
    }

    #[test]
    fn test_lblock_hash_changes_with_transactions() {
        let keypair = KeyPair::generate();
        let a = LBlock::seal(&keypair, Hash::zero(), vec![tx(1)], Hash::zero());
        let b = LBlock::seal(&keypair, Hash::zero(), vec![tx(2)], Hash::zero());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_hblock_verify() {
        let keypair = KeyPair::generate();
        let block = HBlock::create(
            &keypair,
            Hash::zero(),
            vec![tx(1), tx(2)],
            AddressMap::new(),
        );

        assert!(block.verify(&keypair.public_key()).is_ok());

        let mut forged = block.clone();
        forged.transactions.push(tx(3));
        assert!(forged.verify(&keypair.public_key()).is_err());
    }

    #[test]
    fn test_genesis_grants_initial_supply() {
        let keypair = KeyPair::generate();
        let bank_address = Address(keypair.public_key());
        let genesis = HBlock::genesis(&keypair, bank_address);

        assert!(genesis.prev_hash.is_zero());
        assert_eq!(genesis.transactions.len(), 1);
        assert_eq!(
            genesis.transactions[0].outputs,
            vec![(bank_address, Coin::from_units(GENESIS_VALUE))]
        );
        assert!(genesis.verify(&keypair.public_key()).is_ok());
    }

    #[test]
    fn test_hblock_serialization_roundtrip() {
        let keypair = KeyPair::generate();
        let block = HBlock::create(&keypair, Hash::zero(), vec![tx(1)], AddressMap::new());

        let json = serde_json::to_string(&block).unwrap();
        let back: HBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(block, back);
        assert_eq!(block.hash(), back.hash());
    }
}
