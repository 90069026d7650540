//! Authentication module for Coinbase trading APIs.
//!
//! This module provides:
//! - Credential loading with secure secret storage
//! - Replaceable clock sources for signing timestamps
//! - HMAC-SHA256 signature generation
//! - The legacy and modern authentication strategies
//! - [`RequestSigner`], which turns a request into its header set

mod clock;
mod credentials;
mod signature;
mod signer;
mod strategy;

pub use clock::{ClockSource, FixedClock, SyncedClock, SystemClock};
pub use credentials::{
    Credentials, CredentialsConfig, CredentialsProvider, ENV_API_KEY, ENV_API_PASSPHRASE,
    ENV_API_SECRET, ENV_AUTH_STRATEGY,
};
pub use signature::{sign, sign_base64};
pub use signer::{RequestSigner, SignedHeaders, SigningRequest};
pub use strategy::{
    AuthStrategy, CB_ACCESS_KEY, CB_ACCESS_PASSPHRASE, CB_ACCESS_SIGN, CB_ACCESS_TIMESTAMP,
};
