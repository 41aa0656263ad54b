//! RSCoin Mintette
//!
//! An untrusted validator responsible for a subset of transaction hashes:
//! accepts tentative spends, commits transactions into local blocks, and
//! hands its period results to the bank at every period boundary.

pub mod api_server;
pub mod config;
pub mod error;
pub mod node;
pub mod storage;

pub use config::MintetteOpts;
pub use error::{MintetteError, Result};
pub use node::MintetteNode;
pub use storage::{MintetteState, MintetteStatus, TxSignatures};
