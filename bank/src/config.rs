//! Bank runtime configuration

use clap::Parser;
use rscoin_core::{DEFAULT_PERIOD_SECS, DEFAULT_POLL_TIMEOUT_SECS};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rscoin-bank", about = "RSCoin bank node")]
pub struct BankOpts {
    /// Port to listen on
    #[arg(long, default_value_t = 9000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Bank secret key, hex encoded
    #[arg(long, env = "BANK_SECRET_KEY")]
    pub secret_key: String,

    /// Data directory; omit to run with volatile in-memory state
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Wall-clock length of a period, in seconds
    #[arg(long, default_value_t = DEFAULT_PERIOD_SECS)]
    pub period_secs: u64,

    /// Per-mintette timeout for the period-end poll, in seconds
    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_SECS)]
    pub poll_timeout_secs: u64,
}
