//! Bank node
//!
//! Serialized access to the bank state, per-period persistence, and the
//! period driver that polls mintettes and pushes announcements.

use crate::client::MintetteClient;
use crate::error::Result;
use crate::period::{bootstrap_announcements, start_new_period};
use crate::storage::BankState;
use rscoin_core::{Address, HBlock, Mintette, PeriodId, TxStrategy, Utxo};
use rscoin_crypto::{KeyPair, PublicKey};
use rscoin_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

const SNAPSHOT_NAME: &str = "bank-state";

#[derive(Clone)]
pub struct BankNode {
    state: Arc<RwLock<BankState>>,
    keypair: KeyPair,
    store: Store,
}

impl BankNode {
    /// Recover the bank from its snapshot, or start a fresh chain.
    pub fn new(keypair: KeyPair, store: Store) -> Result<Self> {
        let state = match store.load_snapshot::<BankState>(SNAPSHOT_NAME)? {
            Some(state) => {
                log::info!("recovered bank state at period {}", state.period_id());
                state
            }
            None => BankState::new(&keypair),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            keypair,
            store,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub async fn mintettes(&self) -> Vec<Mintette> {
        self.state.read().await.mintettes().clone()
    }

    pub async fn height(&self) -> u64 {
        self.state.read().await.height()
    }

    pub async fn period_id(&self) -> PeriodId {
        self.state.read().await.period_id()
    }

    pub async fn hblock(&self, period_id: PeriodId) -> Option<HBlock> {
        self.state.read().await.hblock(period_id).cloned()
    }

    pub async fn utxo(&self) -> Utxo {
        self.state.read().await.utxo().clone()
    }

    pub async fn add_mintette(&self, mintette: Mintette, key: PublicKey) -> Result<()> {
        self.state.write().await.add_mintette(mintette, key)
    }

    pub async fn add_address(&self, address: Address, strategy: TxStrategy) {
        self.state.write().await.add_address(address, strategy);
    }

    /// Run one period boundary: poll every mintette, close the period,
    /// snapshot, push the announcements.
    pub async fn run_period_boundary(&self, client: &MintetteClient) -> Result<()> {
        let (roster, period_id) = {
            let state = self.state.read().await;
            (state.mintettes().clone(), state.period_id())
        };

        let mut results = Vec::with_capacity(roster.len());
        for mintette in &roster {
            results.push(client.period_finished(mintette, period_id).await);
        }

        let announcements = {
            let mut state = self.state.write().await;
            let announcements = start_new_period(&mut state, &self.keypair, results)?;
            self.store.save_snapshot(SNAPSHOT_NAME, &*state)?;
            announcements
        };

        let new_roster = self.mintettes().await;
        for (mintette, announcement) in new_roster.iter().zip(&announcements) {
            client.announce_new_period(mintette, announcement).await;
        }

        Ok(())
    }

    /// Put the current roster to work before the first boundary.
    pub async fn announce_bootstrap(&self, client: &MintetteClient) {
        let announcements = {
            let state = self.state.read().await;
            bootstrap_announcements(&state)
        };
        let roster = self.mintettes().await;
        for (mintette, announcement) in roster.iter().zip(&announcements) {
            client.announce_new_period(mintette, announcement).await;
        }
    }

    /// Drive period boundaries forever on a fixed wall-clock interval.
    pub async fn run_period_loop(&self, client: MintetteClient, period: Duration) {
        self.announce_bootstrap(&client).await;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = self.run_period_boundary(&client).await {
                log::error!("period boundary failed: {}", e);
            }
        }
    }
}
