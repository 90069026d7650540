//! Types for the REST endpoints used by the transport.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Server time response.
///
/// Accepts both the Advanced Trade shape (`epochSeconds` as a string) and the
/// Exchange shape (`epoch` as fractional seconds).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTime {
    /// ISO 8601 time string.
    pub iso: String,
    /// Whole seconds since the UNIX epoch.
    #[serde(rename = "epochSeconds", alias = "epoch", deserialize_with = "epoch_secs::deserialize")]
    pub epoch_seconds: u64,
    /// Milliseconds since the UNIX epoch, when reported.
    #[serde(rename = "epochMillis", default, deserialize_with = "epoch_millis::deserialize")]
    pub epoch_millis: Option<u64>,
}

/// Deserialize epoch seconds given as a string, integer, or float.
mod epoch_secs {
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Epoch {
        Text(String),
        Int(u64),
        Float(f64),
    }

    impl Epoch {
        pub(super) fn whole<E: de::Error>(self) -> Result<u64, E> {
            match self {
                Self::Int(v) => Ok(v),
                Self::Float(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc() as u64),
                Self::Float(v) => Err(E::custom(format!("invalid epoch value {v}"))),
                Self::Text(s) => {
                    let s = s.trim();
                    match s.parse::<u64>() {
                        Ok(v) => Ok(v),
                        Err(_) => s
                            .parse::<f64>()
                            .map_err(E::custom)
                            .and_then(|v| Self::Float(v).whole()),
                    }
                }
            }
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Epoch::deserialize(deserializer)?.whole()
    }
}

mod epoch_millis {
    use serde::{Deserialize, Deserializer};

    use super::epoch_secs::Epoch;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Epoch>::deserialize(deserializer)?
            .map(Epoch::whole)
            .transpose()
    }
}

/// A monetary amount in one currency.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Balance {
    /// Amount.
    pub value: Decimal,
    /// Currency code.
    pub currency: String,
}

/// A brokerage account.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Account UUID.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Currency held by the account.
    pub currency: String,
    /// Funds available to trade.
    pub available_balance: Balance,
    /// Funds on hold.
    #[serde(default)]
    pub hold: Option<Balance>,
    /// Whether this is the default account for its currency.
    #[serde(default)]
    pub default: bool,
    /// Whether the account is active.
    #[serde(default)]
    pub active: bool,
    /// Account type (e.g., "ACCOUNT_TYPE_CRYPTO").
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
}

/// One page of accounts.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsPage {
    /// Accounts on this page.
    pub accounts: Vec<Account>,
    /// Whether another page follows.
    #[serde(default)]
    pub has_next: bool,
    /// Cursor for the next page.
    #[serde(default)]
    pub cursor: String,
    /// Number of accounts on this page.
    #[serde(default)]
    pub size: u32,
}

/// Request parameters for listing accounts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListAccountsRequest {
    /// Page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Cursor from a previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ListAccountsRequest {
    /// Continue from a previous page.
    pub fn after(page: &AccountsPage) -> Self {
        Self {
            limit: None,
            cursor: Some(page.cursor.clone()),
        }
    }
}
