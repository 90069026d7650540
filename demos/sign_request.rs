//! Example: Loading credentials and signing a request.
//!
//! Run with: cargo run --example sign_request
//!
//! Reads `COINBASE_API_KEY`, `COINBASE_API_SECRET`, `COINBASE_API_PASSPHRASE`
//! and `COINBASE_AUTH_STRATEGY` (from the environment or a `.env` file), and
//! falls back to throwaway modern credentials if none are set.

use std::sync::Arc;

use coinbase_request_signer::auth::{Credentials, FixedClock, RequestSigner, SigningRequest};
use coinbase_request_signer::CoinbaseError;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let credentials = match Credentials::from_env() {
        Ok(creds) => creds,
        Err(CoinbaseError::MissingCredential { field }) => {
            println!("No {field} configured, using demo credentials.");
            Credentials::modern("demo_key", "AQID")
        }
        Err(e) => return Err(e.into()),
    };
    println!("Credentials: {:?}", credentials);

    // A fixed clock makes the output reproducible.
    let signer = RequestSigner::new(Arc::new(credentials), Arc::new(FixedClock(1_700_000_000)));

    let request = SigningRequest::new("GET", "/api/v3/brokerage/accounts", "", 1_700_000_000);
    println!("Canonical message: {}", request.canonical_message());

    let headers = signer.sign_request(&request)?;
    for (name, value) in headers.iter() {
        if name == "CB-ACCESS-PASSPHRASE" {
            println!("{name}: [REDACTED]");
        } else {
            println!("{name}: {value}");
        }
    }

    Ok(())
}
