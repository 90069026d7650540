//! Credential management for Coinbase API authentication.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::auth::AuthStrategy;
use crate::error::CoinbaseError;

/// Default environment variable for the API key.
pub const ENV_API_KEY: &str = "COINBASE_API_KEY";
/// Default environment variable for the API secret.
pub const ENV_API_SECRET: &str = "COINBASE_API_SECRET";
/// Default environment variable for the legacy passphrase.
pub const ENV_API_PASSPHRASE: &str = "COINBASE_API_PASSPHRASE";
/// Default environment variable for the strategy name.
pub const ENV_AUTH_STRATEGY: &str = "COINBASE_AUTH_STRATEGY";

/// Unvalidated credential settings as supplied by configuration.
///
/// Turn into [`Credentials`] with [`Credentials::load`].
#[derive(Clone, Default, Deserialize)]
pub struct CredentialsConfig {
    /// The API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// The API secret (raw for legacy, base64 for modern)
    #[serde(default)]
    pub api_secret: Option<String>,
    /// The passphrase, legacy only
    #[serde(default)]
    pub passphrase: Option<String>,
    /// Which authentication scheme the key belongs to
    #[serde(default)]
    pub strategy: AuthStrategy,
}

impl CredentialsConfig {
    /// Read configuration from the default environment variables.
    ///
    /// Reads `COINBASE_API_KEY`, `COINBASE_API_SECRET`, `COINBASE_API_PASSPHRASE`
    /// and `COINBASE_AUTH_STRATEGY`. Unset variables are left empty; only an
    /// unparseable strategy is an error here.
    pub fn from_env() -> Result<Self, CoinbaseError> {
        Self::from_env_vars(ENV_API_KEY, ENV_API_SECRET, ENV_API_PASSPHRASE, ENV_AUTH_STRATEGY)
    }

    /// Read configuration from custom environment variable names.
    pub fn from_env_vars(
        key_var: &str,
        secret_var: &str,
        passphrase_var: &str,
        strategy_var: &str,
    ) -> Result<Self, CoinbaseError> {
        let strategy = match std::env::var(strategy_var) {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => AuthStrategy::default(),
        };

        Ok(Self {
            api_key: std::env::var(key_var).ok(),
            api_secret: std::env::var(secret_var).ok(),
            passphrase: std::env::var(passphrase_var).ok(),
            strategy,
        })
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, CoinbaseError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "[REDACTED]"))
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("strategy", &self.strategy)
            .finish()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Validated API credentials bound to one authentication strategy.
///
/// Immutable once built; share it behind an `Arc` between signers.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: SecretString,
    passphrase: Option<SecretString>,
    strategy: AuthStrategy,
}

impl Credentials {
    /// Credentials for the legacy key/secret/passphrase scheme.
    ///
    /// Unchecked: values are taken as given. Use [`Credentials::load`] for
    /// configuration that may be incomplete, or [`Credentials::validate`].
    pub fn legacy(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            passphrase: Some(SecretString::from(passphrase.into())),
            strategy: AuthStrategy::Legacy,
        }
    }

    /// Credentials for the modern key/secret scheme. The secret is base64.
    ///
    /// Unchecked, like [`Credentials::legacy`].
    pub fn modern(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: SecretString::from(api_secret.into()),
            passphrase: None,
            strategy: AuthStrategy::Modern,
        }
    }

    /// Validate configuration and build credentials.
    ///
    /// Fails with [`CoinbaseError::MissingCredential`] when the key or secret is
    /// absent, or when the strategy is legacy and the passphrase is absent.
    pub fn load(config: &CredentialsConfig) -> Result<Self, CoinbaseError> {
        let passphrase = non_empty(config.passphrase.as_ref());
        let credentials = Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            api_secret: SecretString::from(config.api_secret.clone().unwrap_or_default()),
            passphrase: passphrase.map(|p| SecretString::from(p.to_string())),
            strategy: config.strategy,
        };
        credentials.validate()?;

        if !config.strategy.requires_passphrase() && passphrase.is_some() {
            tracing::warn!(
                strategy = %config.strategy,
                "passphrase configured for credentials that do not use one; it will not be sent"
            );
        }

        tracing::debug!(strategy = %config.strategy, "credentials loaded");
        Ok(credentials)
    }

    /// Check that every field the strategy needs is present and non-blank.
    ///
    /// [`Credentials::load`] runs this; call it yourself after
    /// [`Credentials::legacy`] or [`Credentials::modern`].
    pub fn validate(&self) -> Result<(), CoinbaseError> {
        if self.api_key.trim().is_empty() {
            return Err(CoinbaseError::MissingCredential { field: "api_key" });
        }
        if self.api_secret.expose_secret().trim().is_empty() {
            return Err(CoinbaseError::MissingCredential { field: "api_secret" });
        }
        let has_passphrase = self
            .expose_passphrase()
            .is_some_and(|p| !p.trim().is_empty());
        if self.strategy.requires_passphrase() && !has_passphrase {
            return Err(CoinbaseError::MissingCredential {
                field: "passphrase",
            });
        }
        Ok(())
    }

    /// Load credentials from the default environment variables.
    pub fn from_env() -> Result<Self, CoinbaseError> {
        Self::load(&CredentialsConfig::from_env()?)
    }

    /// The API key (public identifier).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The strategy these credentials were issued for.
    pub fn strategy(&self) -> AuthStrategy {
        self.strategy
    }

    /// Get the API secret for signing.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    /// Get the passphrase, if one is held.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose_passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.expose_secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "[REDACTED]"))
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Trait for providing API credentials.
///
/// Implement this trait to customize how credentials are retrieved,
/// for example from a secrets manager.
pub trait CredentialsProvider: Send + Sync {
    /// Get the credentials.
    fn get_credentials(&self) -> &Credentials;
}

impl CredentialsProvider for Credentials {
    fn get_credentials(&self) -> &Credentials {
        self
    }
}

impl<T: CredentialsProvider + ?Sized> CredentialsProvider for Arc<T> {
    fn get_credentials(&self) -> &Credentials {
        (**self).get_credentials()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: AuthStrategy, passphrase: Option<&str>) -> CredentialsConfig {
        CredentialsConfig {
            api_key: Some("key".into()),
            api_secret: Some("c2VjcmV0".into()),
            passphrase: passphrase.map(Into::into),
            strategy,
        }
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials::legacy("my_key", "super_secret", "hunter2");
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("my_key"));
        assert!(!debug_str.contains("super_secret"));
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_config_debug_redacted() {
        let debug_str = format!("{:?}", config(AuthStrategy::Legacy, Some("hunter2")));
        assert!(!debug_str.contains("c2VjcmV0"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_load_modern() {
        let creds = Credentials::load(&config(AuthStrategy::Modern, None)).unwrap();
        assert_eq!(creds.api_key(), "key");
        assert_eq!(creds.expose_secret(), "c2VjcmV0");
        assert_eq!(creds.strategy(), AuthStrategy::Modern);
        assert!(creds.expose_passphrase().is_none());
    }

    #[test]
    fn test_load_legacy_requires_passphrase() {
        let err = Credentials::load(&config(AuthStrategy::Legacy, None)).unwrap_err();
        assert!(matches!(
            err,
            CoinbaseError::MissingCredential { field: "passphrase" }
        ));

        let err = Credentials::load(&config(AuthStrategy::Legacy, Some("  "))).unwrap_err();
        assert!(matches!(
            err,
            CoinbaseError::MissingCredential { field: "passphrase" }
        ));
    }

    #[test]
    fn test_load_requires_key_and_secret() {
        let mut missing_key = config(AuthStrategy::Modern, None);
        missing_key.api_key = None;
        assert!(matches!(
            Credentials::load(&missing_key),
            Err(CoinbaseError::MissingCredential { field: "api_key" })
        ));

        let mut empty_secret = config(AuthStrategy::Modern, None);
        empty_secret.api_secret = Some(String::new());
        assert!(matches!(
            Credentials::load(&empty_secret),
            Err(CoinbaseError::MissingCredential { field: "api_secret" })
        ));
    }

    #[test]
    fn test_loaded_key_only_readable() {
        let config = config(AuthStrategy::Modern, None);
        let creds = Credentials::load(&config).unwrap();
        let copy = creds.clone();
        assert_eq!(copy.api_key(), "key");
        assert_eq!(creds.api_key(), config.api_key.as_deref().unwrap());
    }

    #[test]
    fn test_validate_direct_construction() {
        assert!(Credentials::modern("key", "AQID").validate().is_ok());
        assert!(Credentials::legacy("key", "secret", "pass").validate().is_ok());

        assert!(matches!(
            Credentials::modern("", "AQID").validate(),
            Err(CoinbaseError::MissingCredential { field: "api_key" })
        ));
        assert!(matches!(
            Credentials::modern("key", " ").validate(),
            Err(CoinbaseError::MissingCredential { field: "api_secret" })
        ));
        assert!(matches!(
            Credentials::legacy("key", "secret", "").validate(),
            Err(CoinbaseError::MissingCredential { field: "passphrase" })
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{"api_key":"k","api_secret":"s","passphrase":"p","strategy":"legacy"}"#;
        let config = CredentialsConfig::from_json(json).unwrap();
        let creds = Credentials::load(&config).unwrap();
        assert_eq!(creds.strategy(), AuthStrategy::Legacy);
        assert_eq!(creds.expose_passphrase(), Some("p"));
    }

    #[test]
    fn test_config_from_json_defaults_to_modern() {
        let config = CredentialsConfig::from_json(r#"{"api_key":"k","api_secret":"AQID"}"#).unwrap();
        assert_eq!(config.strategy, AuthStrategy::Modern);
    }

    #[test]
    fn test_config_from_custom_env_vars() {
        // Variable names unique to this test to avoid cross-test interference.
        unsafe {
            std::env::set_var("CBRS_TEST_KEY", "env_key");
            std::env::set_var("CBRS_TEST_SECRET", "env_secret");
            std::env::set_var("CBRS_TEST_PASSPHRASE", "env_pass");
            std::env::set_var("CBRS_TEST_STRATEGY", "LEGACY");
        }
        let config = CredentialsConfig::from_env_vars(
            "CBRS_TEST_KEY",
            "CBRS_TEST_SECRET",
            "CBRS_TEST_PASSPHRASE",
            "CBRS_TEST_STRATEGY",
        )
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("env_key"));
        assert_eq!(config.strategy, AuthStrategy::Legacy);
    }

    #[test]
    fn test_provider_through_arc() {
        let provider: Arc<dyn CredentialsProvider> = Arc::new(Credentials::modern("key", "AQID"));
        assert_eq!(provider.get_credentials().api_key(), "key");
    }
}
