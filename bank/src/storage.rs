//! Bank storage
//!
//! The roster, the delegation keys, the address-strategy map, the canonical
//! block chain and the global UTXO. Mutation happens through the period
//! engine; admissions and registrations queue up in pending sets merged at
//! the period boundary.

use crate::error::{BankError, Result};
use rscoin_core::{
    Address, AddressMap, Dpk, HBlock, Mintette, MintetteId, PeriodId, TxStrategy, Utxo,
};
use rscoin_crypto::{Hash, KeyPair, PublicKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankState {
    pub(crate) mintettes: Vec<Mintette>,
    /// Roster keys, same order as `mintettes`.
    pub(crate) mintette_keys: Vec<PublicKey>,
    pub(crate) dpk: Dpk,
    /// Admissions waiting for the next period boundary.
    pub(crate) pending_mintettes: Vec<(Mintette, PublicKey)>,
    #[serde(with = "rscoin_core::serde_pairs")]
    pub(crate) addresses: AddressMap,
    #[serde(with = "rscoin_core::serde_pairs")]
    pub(crate) pending_addresses: AddressMap,
    /// Canonical chain, most recent first; the genesis block is always last.
    pub(crate) blocks: Vec<HBlock>,
    #[serde(with = "rscoin_core::serde_pairs")]
    pub(crate) utxo: Utxo,
    /// Emission inputs minted so far, most recent first.
    pub(crate) emission_hashes: Vec<Hash>,
    pub(crate) period_id: PeriodId,
    /// Consecutive missed or invalid results, per roster position.
    pub(crate) failure_counts: Vec<u32>,
    /// Validated action-log head of the previous period, per roster position.
    pub(crate) log_heads: Vec<Hash>,
    pub(crate) explorers: BTreeSet<String>,
}

impl BankState {
    /// Fresh bank: genesis block, its grant in the global UTXO, no roster.
    pub fn new(keypair: &KeyPair) -> Self {
        Self::with_mintettes(keypair, Vec::new())
    }

    /// Fresh bank with an initial roster active from period 0.
    pub fn with_mintettes(keypair: &KeyPair, roster: Vec<(Mintette, PublicKey)>) -> Self {
        let genesis = HBlock::genesis(keypair, Address(keypair.public_key()));

        let mut utxo = Utxo::new();
        for (addr_id, address) in genesis.transactions[0].output_addr_ids() {
            utxo.insert(addr_id, address);
        }

        let (mintettes, mintette_keys): (Vec<Mintette>, Vec<PublicKey>) =
            roster.into_iter().unzip();
        let dpk = mintette_keys
            .iter()
            .map(|pk| (*pk, keypair.sign_value(pk)))
            .collect();

        BankState {
            failure_counts: vec![0; mintettes.len()],
            log_heads: vec![Hash::zero(); mintettes.len()],
            mintettes,
            mintette_keys,
            dpk,
            pending_mintettes: Vec::new(),
            addresses: AddressMap::new(),
            pending_addresses: AddressMap::new(),
            blocks: vec![genesis],
            utxo,
            emission_hashes: Vec::new(),
            period_id: 0,
            explorers: BTreeSet::new(),
        }
    }

    pub fn mintettes(&self) -> &Vec<Mintette> {
        &self.mintettes
    }

    pub fn mintette_keys(&self) -> &Vec<PublicKey> {
        &self.mintette_keys
    }

    pub fn dpk(&self) -> &Dpk {
        &self.dpk
    }

    pub fn period_id(&self) -> PeriodId {
        self.period_id
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn addresses(&self) -> &AddressMap {
        &self.addresses
    }

    /// Number of blocks in the canonical chain.
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64
    }

    pub fn last_hblock(&self) -> &HBlock {
        self.blocks.first().expect("chain always holds genesis")
    }

    /// Block of period `period_id`, genesis being period 0.
    pub fn hblock(&self, period_id: PeriodId) -> Option<&HBlock> {
        let height = self.blocks.len() as u64;
        if period_id >= height {
            return None;
        }
        self.blocks.get((height - 1 - period_id) as usize)
    }

    /// Queue a mintette for admission at the next period boundary.
    pub fn add_mintette(&mut self, mintette: Mintette, key: PublicKey) -> Result<()> {
        let already_known = self
            .mintette_keys
            .iter()
            .chain(self.pending_mintettes.iter().map(|(_, k)| k))
            .any(|k| *k == key);
        if already_known {
            return Err(BankError::Internal(format!(
                "mintette key already registered: {}",
                key
            )));
        }

        self.pending_mintettes.push((mintette, key));
        Ok(())
    }

    /// Queue an address strategy for the next period boundary.
    pub fn add_address(&mut self, address: Address, strategy: TxStrategy) {
        self.pending_addresses.insert(address, strategy);
    }

    pub fn add_explorer(&mut self, id: String) {
        self.explorers.insert(id);
    }

    pub fn check_explorer(&self, id: &str) -> Result<()> {
        if self.explorers.contains(id) {
            Ok(())
        } else {
            Err(BankError::UnknownExplorer(id.to_string()))
        }
    }

    pub(crate) fn mintette_key(&self, id: MintetteId) -> Result<&PublicKey> {
        self.mintette_keys
            .get(id)
            .ok_or_else(|| BankError::UnknownMintette(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rscoin_core::constants::GENESIS_VALUE;
    use rscoin_core::Coin;

    #[test]
    fn test_new_bank_holds_genesis_grant() {
        let keypair = KeyPair::generate();
        let state = BankState::new(&keypair);

        assert_eq!(state.height(), 1);
        assert_eq!(state.period_id(), 0);
        assert_eq!(state.utxo().len(), 1);

        let total = Coin::sum(state.utxo().keys().map(|a| a.value)).unwrap();
        assert_eq!(total, Coin::from_units(GENESIS_VALUE));
    }

    #[test]
    fn test_hblock_lookup_by_period() {
        let keypair = KeyPair::generate();
        let state = BankState::new(&keypair);

        assert_eq!(state.hblock(0), Some(state.last_hblock()));
        assert!(state.hblock(1).is_none());
    }

    #[test]
    fn test_duplicate_mintette_key_rejected() {
        let keypair = KeyPair::generate();
        let mut state = BankState::new(&keypair);
        let mintette_key = KeyPair::generate().public_key();
        let location = Mintette {
            host: "127.0.0.1".to_string(),
            port: 9001,
        };

        state.add_mintette(location.clone(), mintette_key).unwrap();
        assert!(state.add_mintette(location, mintette_key).is_err());
    }

    #[test]
    fn test_unknown_explorer() {
        let keypair = KeyPair::generate();
        let mut state = BankState::new(&keypair);

        assert_eq!(
            state.check_explorer("exp-1"),
            Err(BankError::UnknownExplorer("exp-1".to_string()))
        );
        state.add_explorer("exp-1".to_string());
        assert!(state.check_explorer("exp-1").is_ok());
    }
}
