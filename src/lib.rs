//! # Coinbase Request Signer
//!
//! Authenticated request signing for the Coinbase trading REST APIs.
//!
//! ## Features
//!
//! - Both authentication generations: legacy (key, secret, passphrase) and
//!   modern (key, base64 secret)
//! - HMAC-SHA256 over `timestamp + METHOD + path + body`
//! - Replaceable clock with server-time resynchronization
//! - Secrets held in `secrecy` wrappers and redacted from `Debug`
//! - An async REST transport that reports suspected clock skew
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use coinbase_request_signer::auth::{Credentials, RequestSigner};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Arc::new(Credentials::modern("api_key", "c2VjcmV0"));
//! let signer = RequestSigner::with_system_clock(credentials);
//!
//! let headers = signer.sign("GET", "/api/v3/brokerage/accounts", "")?;
//! for (name, value) in headers.iter() {
//!     println!("{name}: {value}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod rest;

// Re-export commonly used types at crate root
pub use auth::{AuthStrategy, Credentials, RequestSigner};
pub use error::CoinbaseError;

/// Result type alias using CoinbaseError
pub type Result<T> = std::result::Result<T, CoinbaseError>;
