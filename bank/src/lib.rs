//! RSCoin Bank
//!
//! The trusted coordinator: admits mintettes, closes periods by validating
//! and merging their local blocks, mints the period emission, and publishes
//! the canonical higher-level block chain.

pub mod api_server;
pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod period;
pub mod storage;

pub use config::BankOpts;
pub use error::{BankError, Result};
pub use node::BankNode;
pub use storage::BankState;
