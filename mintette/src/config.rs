//! Mintette runtime configuration

use clap::Parser;
use rscoin_core::DEFAULT_SNAPSHOT_EVERY;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rscoin-mintette", about = "RSCoin mintette node")]
pub struct MintetteOpts {
    /// Port to listen on
    #[arg(long, default_value_t = 9001)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Mintette secret key, hex encoded
    #[arg(long, env = "MINTETTE_SECRET_KEY")]
    pub secret_key: String,

    /// Data directory; omit to run with volatile in-memory state
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Periods between full state snapshots
    #[arg(long, default_value_t = DEFAULT_SNAPSHOT_EVERY)]
    pub snapshot_every: u64,
}
