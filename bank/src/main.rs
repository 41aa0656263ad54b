//! RSCoin Bank Binary

use clap::Parser;
use rscoin_bank::client::MintetteClient;
use rscoin_bank::{api_server, BankNode, BankOpts};
use rscoin_crypto::KeyPair;
use rscoin_storage::Store;
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opts = BankOpts::parse();

    println!("🏦 Starting RSCoin bank...");

    let keypair = KeyPair::from_secret_hex(&opts.secret_key).map_err(|e| {
        eprintln!("❌ Invalid bank secret key: {}", e);
        e
    })?;
    println!("✅ Bank key loaded: {}", keypair.public_key());

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

    let node = BankNode::new(keypair, store).map_err(|e| {
        eprintln!("❌ Failed to recover bank state: {}", e);
        e
    })?;
    println!("✅ Chain height {}", node.height().await);

    let client = MintetteClient::new(Duration::from_secs(opts.poll_timeout_secs));
    let driver = node.clone();
    let period = Duration::from_secs(opts.period_secs);
    tokio::spawn(async move {
        driver.run_period_loop(client, period).await;
    });

    let addr: SocketAddr = format!("{}:{}", opts.bind, opts.port).parse()?;
    println!("✅ Listening on {}", addr);

    api_server::start_server(addr, node).await
}
