//! Action log
//!
//! Hash-chained record of every state-changing step a mintette takes within
//! a period. The bank replays the chain at period end to validate what each
//! mintette claims to have done.

use crate::block::LBlock;
use crate::transaction::{AddrId, Transaction};
use crate::{MintetteId, PeriodId};
use rscoin_crypto::{hash_value, CryptoError, Hash, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionLogError {
    #[error("Log entry {index} does not chain from its predecessor")]
    BrokenChain { index: usize },

    #[error("Epoch slice does not close with the block being checked")]
    EpochMismatch,

    #[error("Block transactions do not match the log")]
    TransactionMismatch,

    #[error("Block does not extend the expected higher-level block")]
    WrongPrevBlock,

    #[error("Bad mintette signature on block")]
    BadBlockSignature,
}

/// A mintette's signed receipt for one tentative spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfirmation {
    /// Mintette key over `(transaction, addr_id, log_head)`.
    pub signature: Signature,
    /// Log head just before the query was appended.
    pub log_head: Hash,
    pub period_id: PeriodId,
}

impl CheckConfirmation {
    pub fn verify(
        &self,
        key: &PublicKey,
        transaction: &Transaction,
        addr_id: &AddrId,
    ) -> Result<(), CryptoError> {
        key.verify_value(&(transaction, addr_id, &self.log_head), &self.signature)
    }
}

/// Confirmations gathered by a client, keyed by the confirming mintette and
/// the input it confirmed.
pub type CheckConfirmations = BTreeMap<(MintetteId, AddrId), CheckConfirmation>;

/// A mintette's signed receipt for a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAcknowledgment {
    /// Mintette key over `(transaction, log_head)`.
    pub mintette_signature: Signature,
    /// The bank's signature over this mintette's key, from the dpk.
    pub bank_signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionLogEntry {
    /// A tentative spend accepted by `check_not_double_spent`.
    Query {
        transaction: Transaction,
        addr_id: AddrId,
        confirmation: CheckConfirmation,
    },
    /// A transaction committed with its gathered confirmations.
    Commit {
        transaction: Transaction,
        #[serde(with = "crate::serde_pairs")]
        confirmations: CheckConfirmations,
    },
    /// An epoch sealed into the local block with this hash.
    CloseEpoch { lblock_hash: Hash },
}

/// One log link: the entry plus the hash of the preceding link. The first
/// link of a period carries the archived head of the prior period, or zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogItem {
    pub entry: ActionLogEntry,
    pub prev: Hash,
}

impl ActionLogItem {
    pub fn hash(&self) -> Hash {
        hash_value(self)
    }
}

pub type ActionLog = Vec<ActionLogItem>;

/// Verify the chain oldest-first against the stored prior head; returns the
/// resulting head.
pub fn check_action_log(prev_head: &Hash, log: &[ActionLogItem]) -> Result<Hash, ActionLogError> {
    let mut head = *prev_head;
    for (index, item) in log.iter().enumerate() {
        if item.prev != head {
            return Err(ActionLogError::BrokenChain { index });
        }
        head = item.hash();
    }
    Ok(head)
}

/// Validate one local block against the epoch slice of the log that sealed
/// it: mintette signature, prev-block link, closing entry, and the committed
/// transactions in order.
pub fn check_lblock(
    key: &PublicKey,
    prev_hblock_hash: &Hash,
    epoch_slice: &[ActionLogItem],
    block: &LBlock,
) -> Result<(), ActionLogError> {
    block
        .verify(key)
        .map_err(|_| ActionLogError::BadBlockSignature)?;

    if block.prev_hblock_hash != *prev_hblock_hash {
        return Err(ActionLogError::WrongPrevBlock);
    }

    let (close, body) = epoch_slice
        .split_last()
        .ok_or(ActionLogError::EpochMismatch)?;
    match &close.entry {
        ActionLogEntry::CloseEpoch { lblock_hash } if *lblock_hash == block.hash() => {}
        _ => return Err(ActionLogError::EpochMismatch),
    }
    if block.log_head != close.prev {
        return Err(ActionLogError::EpochMismatch);
    }

    let committed: Vec<&Transaction> = body
        .iter()
        .filter_map(|item| match &item.entry {
            ActionLogEntry::Commit { transaction, .. } => Some(transaction),
            _ => None,
        })
        .collect();

    if committed.len() != block.transactions.len()
        || committed
            .iter()
            .zip(&block.transactions)
            .any(|(logged, sealed)| **logged != *sealed)
    {
        return Err(ActionLogError::TransactionMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::coin::Coin;
    use rscoin_crypto::KeyPair;

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

    fn commit_item(seed: u64, prev: Hash) -> ActionLogItem {
        ActionLogItem {
            entry: ActionLogEntry::Commit {
                transaction: tx(seed),
                confirmations: CheckConfirmations::new(),
            },
            prev,
        }
    }

    /// Build a well-formed epoch: commits chained from `prev_head`, then the
    /// sealing block plus its close entry.
    fn epoch(
        keypair: &KeyPair,
        prev_head: Hash,
        prev_hblock: Hash,
        seeds: &[u64],
    ) -> (Vec<ActionLogItem>, LBlock) {
        let mut items = Vec::new();
        let mut head = prev_head;
        for &seed in seeds {
            let item = commit_item(seed, head);
            head = item.hash();
            items.push(item);
        }

        let transactions = items
            .iter()
            .filter_map(|item| match &item.entry {
                ActionLogEntry::Commit { transaction, .. } => Some(transaction.clone()),
                _ => None,
            })
            .collect();
        let block = LBlock::seal(keypair, prev_hblock, transactions, head);

        let close = ActionLogItem {
            entry: ActionLogEntry::CloseEpoch {
                lblock_hash: block.hash(),
            },
            prev: head,
        };
        items.push(close);

        (items, block)
    }

    #[test]
    fn test_check_action_log_accepts_chain() {
        let first = commit_item(1, Hash::zero());
        let second = commit_item(2, first.hash());
        let head = second.hash();

        assert_eq!(
            check_action_log(&Hash::zero(), &[first, second]),
            Ok(head)
        );
    }

    #[test]
    fn test_check_action_log_rejects_broken_chain() {
        let first = commit_item(1, Hash::zero());
        let stray = commit_item(2, hash_value(&"elsewhere"));

        assert_eq!(
            check_action_log(&Hash::zero(), &[first, stray]),
            Err(ActionLogError::BrokenChain { index: 1 })
        );
    }

    #[test]
    fn test_check_action_log_empty_keeps_head() {
        let head = hash_value(&"head");
        assert_eq!(check_action_log(&head, &[]), Ok(head));
    }

    #[test]
    fn test_check_lblock_accepts_sealed_epoch() {
        let keypair = KeyPair::generate();
        let prev_hblock = hash_value(&"hblock");
        let (items, block) = epoch(&keypair, Hash::zero(), prev_hblock, &[1, 2]);

        assert_eq!(
            check_lblock(&keypair.public_key(), &prev_hblock, &items, &block),
            Ok(())
        );
    }

    #[test]
    fn test_check_lblock_rejects_wrong_prev_block() {
        let keypair = KeyPair::generate();
        let prev_hblock = hash_value(&"hblock");
        let (items, block) = epoch(&keypair, Hash::zero(), prev_hblock, &[1]);

        assert_eq!(
            check_lblock(&keypair.public_key(), &Hash::zero(), &items, &block),
            Err(ActionLogError::WrongPrevBlock)
        );
    }

    #[test]
    fn test_check_lblock_rejects_transaction_mismatch() {
        let keypair = KeyPair::generate();
        let prev_hblock = hash_value(&"hblock");
        let (items, block) = epoch(&keypair, Hash::zero(), prev_hblock, &[1, 2]);

        // A block sealed over different transactions than the log records.
        let forged = LBlock::seal(&keypair, prev_hblock, vec![tx(9)], block.log_head);
        let mut forged_items = items;
        let last = forged_items.last_mut().unwrap();
        last.entry = ActionLogEntry::CloseEpoch {
            lblock_hash: forged.hash(),
        };

        assert_eq!(
            check_lblock(&keypair.public_key(), &prev_hblock, &forged_items, &forged),
            Err(ActionLogError::TransactionMismatch)
        );
    }

    #[test]
    fn test_confirmation_verify() {
        let keypair = KeyPair::generate();
        let transaction = tx(1);
        let addr_id = transaction.inputs[0];
        let log_head = Hash::zero();

        let confirmation = CheckConfirmation {
            signature: keypair.sign_value(&(&transaction, &addr_id, &log_head)),
            log_head,
            period_id: 0,
        };

        assert!(confirmation
            .verify(&keypair.public_key(), &transaction, &addr_id)
            .is_ok());
        assert!(confirmation
            .verify(&KeyPair::generate().public_key(), &transaction, &addr_id)
            .is_err());
    }
}
