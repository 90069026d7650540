//! Coinbase REST transport.
//!
//! [`TradingClient`] owns the HTTP stack and calls the
//! [`RequestSigner`](crate::auth::RequestSigner) once per authenticated
//! request. It also interprets authentication rejections, reporting
//! [`ClockSkew`](crate::error::CoinbaseError::ClockSkew) when they look like
//! a drifted clock, and can resynchronize the signing clock from server time.

mod client;
mod endpoints;
pub mod types;

pub use client::{TradingClient, TradingClientBuilder};
pub use endpoints::*;
pub use types::{Account, AccountsPage, Balance, ListAccountsRequest, ServerTime};
