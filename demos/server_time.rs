//! Example: Fetching server time and resynchronizing the signing clock.
//!
//! Run with: cargo run --example server_time

use coinbase_request_signer::rest::TradingClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = TradingClient::new();

    let time = client.get_server_time().await?;
    println!("Server time: {} ({}s)", time.iso, time.epoch_seconds);

    let drift = client.sync_clock().await?;
    println!("Local clock drift: {drift}s");

    Ok(())
}
