//! Coinbase REST API endpoint constants.

/// Base URL for the Advanced Trade REST API (modern credentials).
pub const COINBASE_BASE_URL: &str = "https://api.coinbase.com";

/// Base URL for the Exchange REST API (legacy credentials).
pub const COINBASE_EXCHANGE_BASE_URL: &str = "https://api.exchange.coinbase.com";

/// Public endpoints (no authentication required).
pub mod public {
    /// Get server time.
    pub const SERVER_TIME: &str = "/api/v3/brokerage/time";
    /// Get server time on the Exchange API.
    pub const EXCHANGE_TIME: &str = "/time";
}

/// Private endpoints (authentication required).
pub mod private {
    /// List brokerage accounts.
    pub const ACCOUNTS: &str = "/api/v3/brokerage/accounts";
}
