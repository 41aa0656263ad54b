//! Mintette storage and transactional state machine
//!
//! Holds the UTXO slice this mintette is responsible for, the per-period
//! pending-spend set, the hash-chained action log, and the blocks sealed in
//! the current period. All mutation goes through the check / commit /
//! close-epoch / finish-period / start-period operations; each either
//! applies completely or leaves the state untouched.

use crate::error::{MintetteError, Result};
use rscoin_core::{
    check_action_log, is_owner, owners, ActionLog, ActionLogEntry, ActionLogItem, AddrId, Address,
    AddressMap, CheckConfirmation, CheckConfirmations, CommitAcknowledgment, Dpk, LBlock,
    Mintette, MintetteId, NewPeriodData, PeriodId, PeriodResult, Transaction, TxStrategy, Utxo,
    DEFAULT_LOG_RETENTION,
};
use rscoin_crypto::{Hash, KeyPair, Signature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Signatures authorizing one tentative spend.
pub type TxSignatures = Vec<(Address, Signature)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MintetteStatus {
    /// Started but never adopted a period announcement
    Idle,
    /// Accepting checks and commits
    Running,
    /// Period sealed, waiting for the next announcement
    Sealing,
}

impl fmt::Display for MintetteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running => write!(f, "Running"),
            Self::Sealing => write!(f, "Sealing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintetteState {
    #[serde(with = "rscoin_core::serde_pairs")]
    utxo: Utxo,
    /// Addr ids tentatively spent this period, with the spending transaction.
    #[serde(with = "rscoin_core::serde_pairs")]
    pset: BTreeMap<AddrId, Transaction>,
    action_log: ActionLog,
    /// Hash of the newest log item; survives period boundaries so each
    /// period's first entry links to the archived head of the previous one.
    log_head: Hash,
    /// Committed this period, not yet sealed into a block.
    pending_txs: Vec<Transaction>,
    /// Blocks sealed this period, most recent first.
    lblocks: Vec<LBlock>,
    /// Acknowledgments already handed out this period, by transaction hash.
    #[serde(with = "rscoin_core::serde_pairs")]
    committed: BTreeMap<Hash, CommitAcknowledgment>,
    #[serde(with = "rscoin_core::serde_pairs")]
    addresses: AddressMap,
    period_id: PeriodId,
    mintette_id: Option<MintetteId>,
    previous_mintette_id: Option<MintetteId>,
    mintettes: Vec<Mintette>,
    dpk: Dpk,
    last_hblock_hash: Hash,
    status: MintetteStatus,
    #[serde(with = "rscoin_core::serde_pairs")]
    archived_blocks: BTreeMap<PeriodId, Vec<LBlock>>,
    #[serde(with = "rscoin_core::serde_pairs")]
    archived_logs: BTreeMap<PeriodId, ActionLog>,
    log_retention: u64,
}



impl MintetteState {
    pub fn new() -> Self {
        MintetteState {
            utxo: Utxo::new(),
            pset: BTreeMap::new(),
            action_log: ActionLog::new(),
            log_head: Hash::zero(),
            pending_txs: Vec::new(),
            lblocks: Vec::new(),
            committed: BTreeMap::new(),
            addresses: AddressMap::new(),
            period_id: 0,
            mintette_id: None,
            previous_mintette_id: None,
            mintettes: Vec::new(),
            dpk: Dpk::new(),
            last_hblock_hash: Hash::zero(),
            status: MintetteStatus::Idle,
            archived_blocks: BTreeMap::new(),
            archived_logs: BTreeMap::new(),
            log_retention: DEFAULT_LOG_RETENTION,
        }
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn pset(&self) -> &BTreeMap<AddrId, Transaction> {
        &self.pset
    }

    pub fn status(&self) -> MintetteStatus {
        self.status
    }

    pub fn period_id(&self) -> PeriodId {
        self.period_id
    }

    pub fn mintette_id(&self) -> Option<MintetteId> {
        self.mintette_id
    }

    pub fn previous_mintette_id(&self) -> Option<MintetteId> {
        self.previous_mintette_id
    }

    pub fn log_head(&self) -> Hash {
        self.log_head
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.action_log
    }

    /// Current period id, or `None` before the first announcement. Kept
    /// behind `Result` so the RPC layer can tell "no period yet" apart from
    /// a store failure.
    pub fn current_period(&self) -> Result<Option<PeriodId>> {
        match self.status {
            MintetteStatus::Idle => Ok(None),
            _ => Ok(Some(self.period_id)),
        }
    }

    pub fn archived_blocks(&self, period_id: PeriodId) -> Option<&Vec<LBlock>> {
        self.archived_blocks.get(&period_id)
    }

    pub fn archived_log(&self, period_id: PeriodId) -> Option<&ActionLog> {
        self.archived_logs.get(&period_id)
    }

    fn require_running(&self) -> Result<()> {
        match self.status {
            MintetteStatus::Running => Ok(()),
            other => Err(MintetteError::NotActive(other.to_string())),
        }
    }

    fn append_log(&mut self, entry: ActionLogEntry) {
        let item = ActionLogItem {
            entry,
            prev: self.log_head,
        };
        self.log_head = item.hash();
        self.action_log.push(item);
    }

    /// Tentatively spend `addr_id` through `tx`, in check-then-commit order.
    ///
    /// Runs the full precondition ladder; on success the addr id enters the
    /// pending-spend set and a signed confirmation is logged and returned.
    pub fn check_not_double_spent(
        &mut self,
        keypair: &KeyPair,
        tx: &Transaction,
        addr_id: &AddrId,
        signatures: &TxSignatures,
    ) -> Result<CheckConfirmation> {
        self.require_running()?;

        if !tx.inputs.contains(addr_id) {
            return Err(MintetteError::InvalidTxInput);
        }

        let owner = *self.utxo.get(addr_id).ok_or(MintetteError::NotUnspent)?;

        if self.pset.contains_key(addr_id) {
            return Err(MintetteError::DoubleSpend);
        }

        tx.validate().map_err(MintetteError::InvalidSum)?;

        let strategy = self
            .addresses
            .get(&owner)
            .cloned()
            .unwrap_or(TxStrategy::Default);
        if !strategy.satisfied_by(&owner, tx, signatures) {
            return Err(MintetteError::UnauthorizedSpend);
        }

        let confirmation = CheckConfirmation {
            signature: keypair.sign_value(&(tx, addr_id, &self.log_head)),
            log_head: self.log_head,
            period_id: self.period_id,
        };

        self.pset.insert(*addr_id, tx.clone());
        self.append_log(ActionLogEntry::Query {
            transaction: tx.clone(),
            addr_id: *addr_id,
            confirmation: confirmation.clone(),
        });

        Ok(confirmation)
    }

    /// Check several inputs of one transaction independently. Entries
    /// succeed or fail on their own; successes are processed (and logged) in
    /// addr-id order.
    pub fn check_tx_batch(
        &mut self,
        keypair: &KeyPair,
        tx: &Transaction,
        signatures: &BTreeMap<AddrId, TxSignatures>,
    ) -> BTreeMap<AddrId, Result<CheckConfirmation>> {
        signatures
            .iter()
            .map(|(addr_id, sigs)| {
                let outcome = self.check_not_double_spent(keypair, tx, addr_id, sigs);
                (*addr_id, outcome)
            })
            .collect()
    }

    /// Commit a checked transaction given the confirmations the client
    /// gathered from the owner mintettes.
    pub fn commit_tx(
        &mut self,
        keypair: &KeyPair,
        tx: &Transaction,
        confirmations: &CheckConfirmations,
    ) -> Result<CommitAcknowledgment> {
        self.require_running()?;

        let tx_hash = tx.hash();
        let n = self.mintettes.len();

        // Every owner of the transaction must have confirmed every input,
        // under the key the bank delegated to it.
        for owner_id in owners(n, &tx_hash) {
            let (owner_key, _) = self
                .dpk
                .get(owner_id)
                .ok_or(MintetteError::NotAllOwnersConfirmed)?;
            for addr_id in &tx.inputs {
                let confirmation = confirmations
                    .get(&(owner_id, *addr_id))
                    .ok_or(MintetteError::NotAllOwnersConfirmed)?;
                confirmation
                    .verify(owner_key, tx, addr_id)
                    .map_err(|_| MintetteError::NotAllOwnersConfirmed)?;
            }
        }

        // The inputs this mintette holds must have passed their checks, and
        // for this same transaction.
        for addr_id in &tx.inputs {
            if self.utxo.contains_key(addr_id) && self.pset.get(addr_id) != Some(tx) {
                return Err(MintetteError::CommitWithoutCheck);
            }
        }

        if let Some(prior) = self.committed.get(&tx_hash) {
            return Ok(prior.clone());
        }

        let self_id = self
            .mintette_id
            .ok_or_else(|| MintetteError::Internal("mintette id not assigned".to_string()))?;
        let (_, bank_signature) = self
            .dpk
            .get(self_id)
            .cloned()
            .ok_or_else(|| MintetteError::Internal("own dpk entry missing".to_string()))?;

        for addr_id in &tx.inputs {
            if self.utxo.remove(addr_id).is_some() {
                self.pset.remove(addr_id);
            }
        }
        for (addr_id, address) in tx.output_addr_ids() {
            if is_owner(n, &addr_id.tx_hash, self_id) {
                self.utxo.insert(addr_id, address);
            }
        }

        let acknowledgment = CommitAcknowledgment {
            mintette_signature: keypair.sign_value(&(tx, &self.log_head)),
            bank_signature,
        };

        self.pending_txs.push(tx.clone());
        self.append_log(ActionLogEntry::Commit {
            transaction: tx.clone(),
            confirmations: confirmations.clone(),
        });
        self.committed.insert(tx_hash, acknowledgment.clone());

        Ok(acknowledgment)
    }

    /// Seal the transactions committed since the last close into a local
    /// block. A no-op when nothing was committed.
    pub fn close_epoch(&mut self, keypair: &KeyPair) {
        if self.pending_txs.is_empty() {
            return;
        }

        let transactions = std::mem::take(&mut self.pending_txs);
        let block = LBlock::seal(keypair, self.last_hblock_hash, transactions, self.log_head);
        let lblock_hash = block.hash();

        self.lblocks.insert(0, block);
        self.append_log(ActionLogEntry::CloseEpoch { lblock_hash });
    }

    /// Seal the period and hand back everything the bank needs to validate
    /// it. The period id is not bumped here; that happens on `start_period`.
    pub fn finish_period(&mut self, keypair: &KeyPair, period_id: PeriodId) -> Result<PeriodResult> {
        self.require_running()?;

        if period_id != self.period_id {
            return Err(MintetteError::WrongPeriod {
                expected: self.period_id,
                got: period_id,
            });
        }

        self.close_epoch(keypair);

        // Oldest first, pairing with the log's epoch slices.
        let lblocks: Vec<LBlock> = self.lblocks.iter().rev().cloned().collect();
        let action_log = self.action_log.clone();

        self.archived_blocks.insert(period_id, lblocks.clone());
        self.archived_logs.insert(period_id, action_log.clone());
        self.prune_archives();

        self.pset.clear();
        self.lblocks.clear();
        self.committed.clear();
        self.status = MintetteStatus::Sealing;

        Ok(PeriodResult {
            period_id,
            lblocks,
            action_log,
        })
    }

    /// Adopt a period announcement from the bank.
    pub fn start_period(&mut self, npd: NewPeriodData) -> Result<()> {
        if self.status != MintetteStatus::Idle && npd.period_id <= self.period_id {
            return Err(MintetteError::WrongPeriod {
                expected: self.period_id + 1,
                got: npd.period_id,
            });
        }
        if self.status == MintetteStatus::Running {
            log::warn!(
                "adopting period {} announcement while still running period {}",
                npd.period_id,
                self.period_id
            );
        }

        self.previous_mintette_id = self.mintette_id;

        let n = npd.mintettes.len();
        match npd.payload {
            Some(payload) => {
                self.mintette_id = Some(payload.mintette_id);
                self.utxo = payload.utxo;
                self.addresses = payload.addresses;
            }
            None => {
                // Self-update: drop what the new block consumed, adopt the
                // outputs this mintette owns under the new roster.
                if let Some(self_id) = self.mintette_id {
                    for tx in &npd.last_hblock.transactions {
                        for addr_id in &tx.inputs {
                            self.utxo.remove(addr_id);
                        }
                        for (addr_id, address) in tx.output_addr_ids() {
                            if is_owner(n, &addr_id.tx_hash, self_id) {
                                self.utxo.insert(addr_id, address);
                            }
                        }
                    }
                }
                self.addresses = npd.last_hblock.addresses.clone();
            }
        }

        self.last_hblock_hash = npd.last_hblock.hash();
        self.mintettes = npd.mintettes;
        self.dpk = npd.dpk;

        // Fresh log for the new period; `log_head` is left alone so the
        // first new entry links to the archived head of the prior period.
        self.action_log.clear();
        self.pset.clear();
        self.pending_txs.clear();
        self.lblocks.clear();
        self.committed.clear();

        self.period_id = npd.period_id;
        self.status = MintetteStatus::Running;

        Ok(())
    }

    fn prune_archives(&mut self) {
        let cutoff = self.period_id.saturating_sub(self.log_retention);
        self.archived_blocks.retain(|&pid, _| pid >= cutoff);
        self.archived_logs.retain(|&pid, _| pid >= cutoff);
    }

    /// Sanity check used after recovery: the current log must chain from
    /// the head archived for the previous period.
    pub fn verify_log_chain(&self) -> Result<()> {
        let prior_head = match self.action_log.first() {
            Some(first) => first.prev,
            None => self.log_head,
        };
        check_action_log(&prior_head, &self.action_log)
            .map_err(|e| MintetteError::Internal(e.to_string()))?;
        Ok(())
    }
}

impl Default for MintetteState {
    fn default() -> Self {
        Self::new()
    }
}
