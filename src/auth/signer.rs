//! Turning a request into its authentication headers.
//!
//! Signing runs one linear pass per request:
//!
//! ```text
//! Unsigned -> MessageBuilt -> Signed -> HeadersReady
//! ```
//!
//! 1. Take a timestamp from the [`ClockSource`].
//! 2. Build the canonical message `timestamp + METHOD + path + body`.
//! 3. Decode the secret according to the [`AuthStrategy`](crate::auth::AuthStrategy).
//! 4. HMAC-SHA256 the message and base64 the result.
//! 5. Let the strategy assemble the header set.
//!
//! Any failure aborts the pass; no partial header set is ever returned.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::ExposeSecret;

use crate::auth::signature::sign_base64;
use crate::auth::{ClockSource, CredentialsProvider, SystemClock};
use crate::error::CoinbaseError;

/// One outgoing request, frozen at a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    method: String,
    path: String,
    body: String,
    timestamp: u64,
}

impl SigningRequest {
    /// Create a signing request. The method is uppercased.
    pub fn new(
        method: impl AsRef<str>,
        path: impl Into<String>,
        body: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// HTTP method, uppercase.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path including any query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw request body, empty for bodiless requests.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Seconds since the UNIX epoch.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The exact string that gets signed.
    pub fn canonical_message(&self) -> String {
        let timestamp = self.timestamp.to_string();
        let mut message = String::with_capacity(
            timestamp.len() + self.method.len() + self.path.len() + self.body.len(),
        );
        message.push_str(&timestamp);
        message.push_str(&self.method);
        message.push_str(&self.path);
        message.push_str(&self.body);
        message
    }
}

/// Ordered authentication headers for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedHeaders {
    entries: Vec<(&'static str, String)>,
}

impl SignedHeaders {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.entries.push((name, value.into()));
    }

    /// Look up a header value. Names compare case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(n, v)| (*n, v.as_str()))
    }

    /// Convert into a `HeaderMap` ready to merge into a request.
    pub fn into_header_map(self) -> Result<HeaderMap, CoinbaseError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in self.entries {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| CoinbaseError::InvalidHeader(format!("{name}: {e}")))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|e| CoinbaseError::InvalidHeader(format!("{name}: {e}")))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

impl IntoIterator for SignedHeaders {
    type Item = (&'static str, String);
    type IntoIter = std::vec::IntoIter<(&'static str, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Produces authentication headers for outgoing requests.
///
/// Holds only shared, read-only state, so one signer can serve any number of
/// concurrent callers.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use coinbase_request_signer::auth::{Credentials, FixedClock, RequestSigner};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Arc::new(Credentials::modern("k1", "AQID"));
/// let signer = RequestSigner::new(credentials, Arc::new(FixedClock(1_700_000_000)));
///
/// let headers = signer.sign("GET", "/api/v3/brokerage/accounts", "")?;
/// assert_eq!(headers.get("CB-ACCESS-TIMESTAMP"), Some("1700000000"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestSigner {
    credentials: Arc<dyn CredentialsProvider>,
    clock: Arc<dyn ClockSource>,
}

impl RequestSigner {
    /// Create a signer from credentials and a clock.
    pub fn new(credentials: Arc<dyn CredentialsProvider>, clock: Arc<dyn ClockSource>) -> Self {
        Self { credentials, clock }
    }

    /// Create a signer that reads the system clock.
    pub fn with_system_clock(credentials: Arc<dyn CredentialsProvider>) -> Self {
        Self::new(credentials, Arc::new(SystemClock))
    }

    /// The credentials this signer uses.
    pub fn credentials(&self) -> &Arc<dyn CredentialsProvider> {
        &self.credentials
    }

    /// The clock this signer reads.
    pub fn clock(&self) -> &Arc<dyn ClockSource> {
        &self.clock
    }

    /// Sign a request stamped with the current clock time.
    pub fn sign(&self, method: &str, path: &str, body: &str) -> Result<SignedHeaders, CoinbaseError> {
        let request = SigningRequest::new(method, path, body, self.clock.now());
        self.sign_request(&request)
    }

    /// Sign a request using the timestamp it already carries.
    pub fn sign_request(&self, request: &SigningRequest) -> Result<SignedHeaders, CoinbaseError> {
        let credentials = self.credentials.get_credentials();
        let strategy = credentials.strategy();

        let message = request.canonical_message();
        tracing::trace!(
            method = request.method(),
            path = request.path(),
            timestamp = request.timestamp(),
            %strategy,
            "canonical message built"
        );

        let secret = strategy.decode_secret(credentials.expose_secret())?;
        let signature = sign_base64(secret.expose_secret(), &message)?;
        tracing::trace!(method = request.method(), path = request.path(), "request signed");

        let headers = strategy.build_headers(
            credentials.api_key(),
            &signature,
            request.timestamp(),
            credentials,
        )?;
        tracing::debug!(
            method = request.method(),
            path = request.path(),
            timestamp = request.timestamp(),
            %strategy,
            headers = headers.len(),
            "authentication headers ready"
        );

        Ok(headers)
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("credentials", self.credentials.get_credentials())
            .finish_non_exhaustive()
    }
}
