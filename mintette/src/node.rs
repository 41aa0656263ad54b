//! Mintette node
//!
//! Wraps the state machine behind a single-writer lock, appends every
//! accepted operation to the change log before acknowledging it, and
//! recovers by replaying the log tail over the latest snapshot.

use crate::error::{MintetteError, Result};
use crate::storage::{MintetteState, MintetteStatus, TxSignatures};
use rscoin_core::{
    ActionLog, AddrId, CheckConfirmation, CheckConfirmations, CommitAcknowledgment, LBlock,
    NewPeriodData, PeriodId, PeriodResult, Transaction, Utxo, DEFAULT_SNAPSHOT_EVERY,
};
use rscoin_crypto::{KeyPair, PublicKey};
use rscoin_storage::Store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::RwLock;

const SNAPSHOT_NAME: &str = "mintette-state";
const EVENTS_NAME: &str = "mintette-events";

/// Replayable state-machine inputs. Only operations that succeeded are
/// appended; Ed25519 signing is deterministic, so replay reproduces
/// byte-identical state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MintetteEvent {
    Check {
        transaction: Transaction,
        addr_id: AddrId,
        signatures: TxSignatures,
    },
    CheckBatch {
        transaction: Transaction,
        signatures: Vec<(AddrId, TxSignatures)>,
    },
    Commit {
        transaction: Transaction,
        #[serde(with = "rscoin_core::serde_pairs")]
        confirmations: CheckConfirmations,
    },
    FinishPeriod {
        period_id: PeriodId,
    },
    StartPeriod {
        data: Box<NewPeriodData>,
    },
}

#[derive(Clone)]
pub struct MintetteNode {
    state: Arc<RwLock<MintetteState>>,
    keypair: KeyPair,
    store: Store,
    snapshot_every: u64,
}

impl MintetteNode {
    /// Recover a node from its store: snapshot, then the logged tail.
    pub fn new(keypair: KeyPair, store: Store, snapshot_every: u64) -> Result<Self> {
        let mut state = store
            .load_snapshot::<MintetteState>(SNAPSHOT_NAME)?
            .unwrap_or_default();

        let events: Vec<MintetteEvent> = store.read_events(EVENTS_NAME)?;
        let replayed = events.len();
        for event in events {
            apply_event(&mut state, &keypair, event);
        }
        if replayed > 0 {
            log::info!("replayed {} logged operations over the snapshot", replayed);
        }
        state.verify_log_chain()?;

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            keypair,
            store,
            snapshot_every: snapshot_every.max(1),
        })
    }

    pub fn volatile(keypair: KeyPair) -> Self {
        Self {
            state: Arc::new(RwLock::new(MintetteState::new())),
            keypair,
            store: Store::volatile(),
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub async fn check_tx(
        &self,
        transaction: Transaction,
        addr_id: AddrId,
        signatures: TxSignatures,
    ) -> Result<CheckConfirmation> {
        let mut state = self.state.write().await;
        let confirmation = guard_panic(|| {
            state.check_not_double_spent(&self.keypair, &transaction, &addr_id, &signatures)
        })??;

        self.store.append_event(
            EVENTS_NAME,
            &MintetteEvent::Check {
                transaction,
                addr_id,
                signatures,
            },
        )?;
        Ok(confirmation)
    }

    pub async fn check_tx_batch(
        &self,
        transaction: Transaction,
        signatures: BTreeMap<AddrId, TxSignatures>,
    ) -> Result<BTreeMap<AddrId, Result<CheckConfirmation>>> {
        let mut state = self.state.write().await;
        let results =
            guard_panic(|| state.check_tx_batch(&self.keypair, &transaction, &signatures))?;

        self.store.append_event(
            EVENTS_NAME,
            &MintetteEvent::CheckBatch {
                transaction,
                signatures: signatures.into_iter().collect(),
            },
        )?;
        Ok(results)
    }

    pub async fn commit_tx(
        &self,
        transaction: Transaction,
        confirmations: CheckConfirmations,
    ) -> Result<CommitAcknowledgment> {
        let mut state = self.state.write().await;
        let acknowledgment =
            guard_panic(|| state.commit_tx(&self.keypair, &transaction, &confirmations))??;

        self.store.append_event(
            EVENTS_NAME,
            &MintetteEvent::Commit {
                transaction,
                confirmations,
            },
        )?;
        Ok(acknowledgment)
    }

    /// Seal the period. Holds the writer lock for the whole duration, so it
    /// is exclusive with every other mutation.
    pub async fn finish_period(&self, period_id: PeriodId) -> Result<PeriodResult> {
        let mut state = self.state.write().await;
        let result = guard_panic(|| state.finish_period(&self.keypair, period_id))??;

        self.store
            .append_event(EVENTS_NAME, &MintetteEvent::FinishPeriod { period_id })?;
        Ok(result)
    }

    /// Adopt a period announcement, snapshotting every few periods.
    pub async fn start_period(&self, data: NewPeriodData) -> Result<()> {
        let mut state = self.state.write().await;
        guard_panic(|| state.start_period(data.clone()))??;

        if data.period_id % self.snapshot_every == 0 {
            self.store.save_snapshot(SNAPSHOT_NAME, &*state)?;
            self.store.truncate_events(EVENTS_NAME)?;
            log::info!("snapshot written at period {}", data.period_id);
        } else {
            self.store.append_event(
                EVENTS_NAME,
                &MintetteEvent::StartPeriod {
                    data: Box::new(data),
                },
            )?;
        }
        Ok(())
    }

    pub async fn current_period(&self) -> Result<Option<PeriodId>> {
        self.state.read().await.current_period()
    }

    pub async fn status(&self) -> MintetteStatus {
        self.state.read().await.status()
    }

    pub async fn utxo(&self) -> Utxo {
        self.state.read().await.utxo().clone()
    }

    /// Blocks for a period: archived, or the current period's sealed so far.
    pub async fn blocks(&self, period_id: PeriodId) -> Option<Vec<LBlock>> {
        let state = self.state.read().await;
        if let Some(blocks) = state.archived_blocks(period_id) {
            return Some(blocks.clone());
        }
        if period_id == state.period_id() {
            return Some(Vec::new());
        }
        None
    }

    pub async fn logs(&self, period_id: PeriodId) -> Option<ActionLog> {
        let state = self.state.read().await;
        if let Some(log) = state.archived_log(period_id) {
            return Some(log.clone());
        }
        if period_id == state.period_id() {
            return Some(state.action_log().clone());
        }
        None
    }

    /// Full state dump, used by recovery checks and tests.
    pub async fn dump_state(&self) -> MintetteState {
        self.state.read().await.clone()
    }
}

/// Run one state-machine call, converting a panic into a typed error so it
/// cannot poison the store.
fn guard_panic<T>(op: impl FnOnce() -> T) -> Result<T> {
    catch_unwind(AssertUnwindSafe(op))
        .map_err(|_| MintetteError::Internal("handler panicked".to_string()))
}

/// Re-run one logged operation during recovery.
fn apply_event(state: &mut MintetteState, keypair: &KeyPair, event: MintetteEvent) {
    let outcome = match event {
        MintetteEvent::Check {
            transaction,
            addr_id,
            signatures,
        } => state
            .check_not_double_spent(keypair, &transaction, &addr_id, &signatures)
            .map(|_| ()),
        MintetteEvent::CheckBatch {
            transaction,
            signatures,
        } => {
            let signatures = signatures.into_iter().collect();
            state.check_tx_batch(keypair, &transaction, &signatures);
            Ok(())
        }
        MintetteEvent::Commit {
            transaction,
            confirmations,
        } => state
            .commit_tx(keypair, &transaction, &confirmations)
            .map(|_| ()),
        MintetteEvent::FinishPeriod { period_id } => {
            state.finish_period(keypair, period_id).map(|_| ())
        }
        MintetteEvent::StartPeriod { data } => state.start_period(*data),
    };

    if let Err(e) = outcome {
        log::warn!("logged operation failed on replay: {}", e);
    }
}
