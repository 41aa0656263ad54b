//! RSCoin Core - Protocol types shared by the bank and the mintettes

pub mod action_log;
pub mod address;
pub mod block;
pub mod coin;
pub mod constants;
pub mod owners;
pub mod protocol;
pub mod serde_pairs;
pub mod strategy;
pub mod transaction;

pub use action_log::{
    check_action_log, check_lblock, ActionLog, ActionLogEntry, ActionLogError, ActionLogItem,
    CheckConfirmation, CheckConfirmations, CommitAcknowledgment,
};
pub use address::Address;
pub use block::{merkle_root, HBlock, LBlock};
pub use coin::Coin;
pub use constants::*;
pub use owners::{is_owner, majority, owners};
pub use protocol::{Dpk, Mintette, NewPeriodData, NewPeriodPayload, PeriodResult};
pub use strategy::TxStrategy;
pub use transaction::{emission_hash, AddrId, Transaction, TransactionError};

use std::collections::BTreeMap;

/// Index of a mintette in the bank's roster.
pub type MintetteId = usize;

/// Numbered epoch bounded by `start_period`/`finish_period`.
pub type PeriodId = u64;

/// Unspent outputs, keyed by the addr id that produced them.
pub type Utxo = BTreeMap<AddrId, Address>;

/// Spend strategies by address.
pub type AddressMap = BTreeMap<Address, TxStrategy>;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
