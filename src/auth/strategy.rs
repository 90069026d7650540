//! The two authentication generations accepted by the exchange.
//!
//! | Strategy | Secret | Headers |
//! |---|---|---|
//! | `Modern` | base64, decoded before use | key, sign, timestamp |
//! | `Legacy` | used as-is | key, sign, timestamp, passphrase |
//!
//! The strategy is chosen by configuration, never guessed from the shape of
//! the secret.

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use secrecy::SecretSlice;
use serde::{Deserialize, Serialize};

use crate::auth::Credentials;
use crate::auth::signer::SignedHeaders;
use crate::error::CoinbaseError;

/// API key header.
pub const CB_ACCESS_KEY: &str = "CB-ACCESS-KEY";
/// Base64 signature header.
pub const CB_ACCESS_SIGN: &str = "CB-ACCESS-SIGN";
/// Decimal seconds timestamp header.
pub const CB_ACCESS_TIMESTAMP: &str = "CB-ACCESS-TIMESTAMP";
/// Passphrase header, legacy scheme only.
pub const CB_ACCESS_PASSPHRASE: &str = "CB-ACCESS-PASSPHRASE";

/// Authentication scheme used to sign requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStrategy {
    /// Three-secret scheme: key, raw secret, passphrase.
    Legacy,
    /// Two-secret scheme: key, base64 secret.
    #[default]
    Modern,
}

impl AuthStrategy {
    /// Whether credentials for this strategy must carry a passphrase.
    pub fn requires_passphrase(self) -> bool {
        matches!(self, Self::Legacy)
    }

    /// Lowercase name as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modern => "modern",
        }
    }

    /// Turn the configured secret into HMAC key bytes.
    ///
    /// A legacy secret is the key itself. A modern secret is base64 and fails
    /// with [`CoinbaseError::InvalidSecretEncoding`] if it does not decode.
    pub fn decode_secret(self, raw: &str) -> Result<SecretSlice<u8>, CoinbaseError> {
        match self {
            Self::Legacy => Ok(SecretSlice::from(raw.as_bytes().to_vec())),
            Self::Modern => BASE64
                .decode(raw.trim())
                .map(SecretSlice::from)
                .map_err(|e| {
                    CoinbaseError::InvalidSecretEncoding(format!(
                        "API secret must be valid base64: {e}"
                    ))
                }),
        }
    }

    /// Assemble the authentication headers for one request.
    ///
    /// `Modern` never emits a passphrase, even when the credentials hold one.
    pub fn build_headers(
        self,
        api_key: &str,
        signature_b64: &str,
        timestamp: u64,
        credentials: &Credentials,
    ) -> Result<SignedHeaders, CoinbaseError> {
        let mut headers = SignedHeaders::with_capacity(4);
        headers.push(CB_ACCESS_KEY, api_key);
        headers.push(CB_ACCESS_SIGN, signature_b64);
        headers.push(CB_ACCESS_TIMESTAMP, timestamp.to_string());

        if let Self::Legacy = self {
            let passphrase = credentials
                .expose_passphrase()
                .ok_or(CoinbaseError::MissingCredential {
                    field: "passphrase",
                })?;
            headers.push(CB_ACCESS_PASSPHRASE, passphrase);
        }

        Ok(headers)
    }
}

impl fmt::Display for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthStrategy {
    type Err = CoinbaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "modern" => Ok(Self::Modern),
            other => Err(CoinbaseError::InvalidConfig(format!(
                "unknown auth strategy '{other}', expected 'legacy' or 'modern'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialsConfig;
    use secrecy::ExposeSecret;

    #[test]
    fn test_modern_decodes_base64() {
        let key = AuthStrategy::Modern.decode_secret("AQID").unwrap();
        assert_eq!(key.expose_secret(), &[1u8, 2, 3]);
    }

    #[test]
    fn test_modern_rejects_non_base64() {
        let err = AuthStrategy::Modern.decode_secret("not-base64!!").unwrap_err();
        assert!(matches!(err, CoinbaseError::InvalidSecretEncoding(_)));
    }

    #[test]
    fn test_legacy_uses_raw_bytes() {
        // Valid base64, but legacy must not decode it.
        let key = AuthStrategy::Legacy.decode_secret("AQID").unwrap();
        assert_eq!(key.expose_secret(), b"AQID");
    }

    #[test]
    fn test_modern_headers_omit_passphrase() {
        // Stale legacy passphrase left in a modern configuration.
        let config = CredentialsConfig {
            api_key: Some("k1".into()),
            api_secret: Some("AQID".into()),
            passphrase: Some("stale".into()),
            strategy: AuthStrategy::Modern,
        };
        let creds = Credentials::load(&config).unwrap();
        assert_eq!(creds.expose_passphrase(), Some("stale"));

        let headers = AuthStrategy::Modern
            .build_headers("k1", "c2ln", 1_700_000_000, &creds)
            .unwrap();

        assert_eq!(headers.len(), 3);
        assert!(!headers.contains(CB_ACCESS_PASSPHRASE));
        assert_eq!(headers.get(CB_ACCESS_TIMESTAMP), Some("1700000000"));
    }

    #[test]
    fn test_legacy_headers_include_passphrase() {
        let creds = Credentials::legacy("k1", "secret", "pass");
        let headers = AuthStrategy::Legacy
            .build_headers("k1", "c2ln", 1_700_000_000, &creds)
            .unwrap();

        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            [CB_ACCESS_KEY, CB_ACCESS_SIGN, CB_ACCESS_TIMESTAMP, CB_ACCESS_PASSPHRASE]
        );
        assert_eq!(headers.get(CB_ACCESS_PASSPHRASE), Some("pass"));
    }

    #[test]
    fn test_legacy_headers_require_passphrase() {
        let creds = Credentials::modern("k1", "AQID");
        let err = AuthStrategy::Legacy
            .build_headers("k1", "c2ln", 1, &creds)
            .unwrap_err();
        assert!(matches!(
            err,
            CoinbaseError::MissingCredential { field: "passphrase" }
        ));
    }

    #[test]
    fn test_parse_strategy() {
        assert_eq!("Legacy".parse::<AuthStrategy>().unwrap(), AuthStrategy::Legacy);
        assert_eq!(" modern ".parse::<AuthStrategy>().unwrap(), AuthStrategy::Modern);
        assert!(matches!(
            "jwt".parse::<AuthStrategy>(),
            Err(CoinbaseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_strategy_serde() {
        let strategy: AuthStrategy = serde_json::from_str(r#""legacy""#).unwrap();
        assert_eq!(strategy, AuthStrategy::Legacy);
        assert_eq!(serde_json::to_string(&AuthStrategy::Modern).unwrap(), r#""modern""#);
    }
}
