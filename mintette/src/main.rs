//! RSCoin Mintette Binary

use clap::Parser;
use rscoin_crypto::KeyPair;
use rscoin_mintette::api_server;
use rscoin_mintette::{MintetteNode, MintetteOpts};
use rscoin_storage::Store;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opts = MintetteOpts::parse();

    println!("🚀 Starting RSCoin mintette...");

    let keypair = KeyPair::from_secret_hex(&opts.secret_key).map_err(|e| {
        eprintln!("❌ Invalid mintette secret key: {}", e);
        e
    })?;
    println!("✅ Mintette key loaded: {}", keypair.public_key());

    let store = match &opts.db {
        Some(path) => {
            let store = Store::open(path)?;
            println!("✅ Store opened at {}", path.display());
            store
        }
        None => {
            println!("⚠️  No --db given, state is volatile");
            Store::volatile()
        }
    };

    let node = MintetteNode::new(keypair, store, opts.snapshot_every).map_err(|e| {
        eprintln!("❌ Failed to recover mintette state: {}", e);
        e
    })?;

    let addr: SocketAddr = format!("{}:{}", opts.bind, opts.port).parse()?;
    println!("✅ Listening on {}", addr);

    api_server::start_server(addr, node).await
}
