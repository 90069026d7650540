//! Coinbase REST API client implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::{ClockSource, CredentialsProvider, RequestSigner, SyncedClock};
use crate::error::{ApiError, CoinbaseError};
use crate::rest::endpoints::{COINBASE_BASE_URL, private, public};
use crate::rest::types::{AccountsPage, ListAccountsRequest, ServerTime};

/// Consecutive 401 responses after which a clock problem is suspected.
const DEFAULT_SKEW_THRESHOLD: u32 = 3;

/// The Coinbase REST transport.
///
/// Signs each private request through a [`RequestSigner`], merges the
/// authentication headers into the outgoing request, and interprets the
/// response status.
///
/// # Example
///
/// ```rust,no_run
/// use coinbase_request_signer::rest::TradingClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Create a client for public endpoints only
///     let client = TradingClient::new();
///
///     let time = client.get_server_time().await?;
///     println!("Server time: {}", time.iso);
///
///     Ok(())
/// }
/// ```
///
/// For private endpoints, provide credentials:
///
/// ```rust,no_run
/// use coinbase_request_signer::auth::Credentials;
/// use coinbase_request_signer::rest::TradingClient;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let credentials = Arc::new(Credentials::from_env()?);
///     let client = TradingClient::builder()
///         .credentials(credentials)
///         .auto_resync(true)
///         .build();
///
///     let page = client.list_accounts(None).await?;
///     println!("Accounts: {}", page.accounts.len());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct TradingClient {
    http_client: ClientWithMiddleware,
    base_url: String,
    server_time_path: String,
    signer: Option<RequestSigner>,
    clock: Arc<dyn ClockSource>,
    rejections: Arc<AtomicU32>,
    skew_threshold: u32,
    auto_resync: bool,
}

impl TradingClient {
    /// Create a new client with default settings.
    ///
    /// This client can only access public endpoints.
    /// Use [`TradingClient::builder()`] to configure credentials for private endpoints.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> TradingClientBuilder {
        TradingClientBuilder::new()
    }

    /// The signer used for private requests, if credentials were given.
    pub fn signer(&self) -> Option<&RequestSigner> {
        self.signer.as_ref()
    }

    /// Consecutive authentication rejections seen since the last success.
    pub fn consecutive_rejections(&self) -> u32 {
        self.rejections.load(Ordering::Acquire)
    }

    /// Get the exchange's current time.
    pub async fn get_server_time(&self) -> Result<ServerTime, CoinbaseError> {
        let url = Url::parse(&format!("{}{}", self.base_url, self.server_time_path))?;
        let response = self.http_client.get(url).send().await?;
        self.parse_response(response, false).await
    }

    /// Align the signing clock with server time.
    ///
    /// Returns how far the server was ahead of the clock before the
    /// adjustment, in seconds (negative if behind). A server time beyond
    /// `i64::MAX` seconds is rejected as [`CoinbaseError::InvalidResponse`].
    pub async fn sync_clock(&self) -> Result<i64, CoinbaseError> {
        let server_time = self.get_server_time().await?;
        let server_now = i64::try_from(server_time.epoch_seconds).map_err(|_| {
            CoinbaseError::InvalidResponse(format!(
                "server time out of range: {}",
                server_time.epoch_seconds
            ))
        })?;
        let local_now = i64::try_from(self.clock.now()).unwrap_or(i64::MAX);
        let drift = server_now.saturating_sub(local_now);

        if self.clock.synchronize(server_time.epoch_seconds) {
            tracing::info!(drift_secs = drift, "signing clock resynchronized");
        } else {
            tracing::warn!(
                drift_secs = drift,
                "configured clock does not support synchronization"
            );
        }
        self.rejections.store(0, Ordering::Release);

        Ok(drift)
    }

    /// List brokerage accounts.
    pub async fn list_accounts(
        &self,
        request: Option<&ListAccountsRequest>,
    ) -> Result<AccountsPage, CoinbaseError> {
        match request {
            Some(params) => self.get_with_params(private::ACCOUNTS, params).await,
            None => self.get(private::ACCOUNTS).await,
        }
    }

    /// Make an authenticated GET request.
    pub async fn get<T>(&self, endpoint: &str) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
    {
        self.private_request(Method::GET, endpoint, None, None).await
    }

    /// Make an authenticated GET request with query parameters.
    ///
    /// The query string is part of the signed path.
    pub async fn get_with_params<T, Q>(&self, endpoint: &str, params: &Q) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let query_string = serde_urlencoded::to_string(params)
            .map_err(|e| CoinbaseError::InvalidResponse(e.to_string()))?;
        let query = (!query_string.is_empty()).then_some(query_string);
        self.private_request(Method::GET, endpoint, query, None).await
    }

    /// Make an authenticated POST request with a JSON body.
    ///
    /// The body is serialized once; the signed bytes are the sent bytes.
    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_string(body)?;
        self.private_request(Method::POST, endpoint, None, Some(body))
            .await
    }

    /// Make an authenticated DELETE request.
    pub async fn delete<T>(&self, endpoint: &str) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
    {
        self.private_request(Method::DELETE, endpoint, None, None)
            .await
    }

    async fn private_request<T>(
        &self,
        method: Method,
        endpoint: &str,
        query: Option<String>,
        body: Option<String>,
    ) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
    {
        let result = self
            .send_signed(&method, endpoint, query.as_deref(), body.as_deref())
            .await;

        match result {
            Err(CoinbaseError::ClockSkew { rejections }) if self.auto_resync => {
                tracing::warn!(
                    rejections,
                    endpoint,
                    "clock skew suspected, resynchronizing before one retry"
                );
                self.sync_clock().await?;
                self.send_signed(&method, endpoint, query.as_deref(), body.as_deref())
                    .await
            }
            other => other,
        }
    }

    /// Sign and send one request. A fresh timestamp is taken on every call.
    async fn send_signed<T>(
        &self,
        method: &Method,
        endpoint: &str,
        query: Option<&str>,
        body: Option<&str>,
    ) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
    {
        let signer = self
            .signer
            .as_ref()
            .ok_or(CoinbaseError::MissingCredential { field: "api_key" })?;

        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint))?;
        if let Some(query) = query {
            url.set_query(Some(query));
        }

        // Sign exactly what goes on the wire.
        let request_path = match url.query() {
            Some(q) => format!("{}?{}", url.path(), q),
            None => url.path().to_string(),
        };
        let headers = signer
            .sign(method.as_str(), &request_path, body.unwrap_or(""))?
            .into_header_map()?;

        let mut request = self
            .http_client
            .request(method.clone(), url)
            .headers(headers);
        if let Some(body) = body {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .body(body.to_string());
        }

        let response = request.send().await?;
        self.parse_response(response, true).await
    }

    /// Interpret a response from the Coinbase API.
    async fn parse_response<T>(
        &self,
        response: reqwest::Response,
        authenticated: bool,
    ) -> Result<T, CoinbaseError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let retry_after_ms = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs.saturating_mul(1000));
        let body = response.text().await?;

        if status.is_success() {
            if authenticated {
                self.rejections.store(0, Ordering::Release);
            }
            return serde_json::from_str(&body).map_err(|e| {
                CoinbaseError::InvalidResponse(format!(
                    "Failed to parse response: {}. Body: {}",
                    e, body
                ))
            });
        }

        let api_error = ApiError::from_body(status.as_u16(), &body);
        match status {
            StatusCode::UNAUTHORIZED if authenticated => {
                let rejections = self.rejections.fetch_add(1, Ordering::AcqRel) + 1;
                if api_error.is_timestamp_rejection() || rejections >= self.skew_threshold {
                    tracing::warn!(rejections, error = %api_error, "authentication rejected, suspecting clock skew");
                    Err(CoinbaseError::ClockSkew { rejections })
                } else {
                    tracing::debug!(rejections, error = %api_error, "authentication rejected");
                    Err(CoinbaseError::Unauthorized(api_error))
                }
            }
            StatusCode::UNAUTHORIZED => Err(CoinbaseError::Unauthorized(api_error)),
            StatusCode::TOO_MANY_REQUESTS => Err(CoinbaseError::RateLimitExceeded { retry_after_ms }),
            _ => Err(CoinbaseError::Api(api_error)),
        }
    }
}

impl Default for TradingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TradingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.signer.is_some())
            .field("skew_threshold", &self.skew_threshold)
            .field("auto_resync", &self.auto_resync)
            .finish()
    }
}

/// Builder for [`TradingClient`].
pub struct TradingClientBuilder {
    base_url: String,
    server_time_path: String,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    clock: Option<Arc<dyn ClockSource>>,
    user_agent: Option<String>,
    max_retries: u32,
    skew_threshold: u32,
    auto_resync: bool,
}

impl TradingClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: COINBASE_BASE_URL.to_string(),
            server_time_path: public::SERVER_TIME.to_string(),
            credentials: None,
            clock: None,
            user_agent: None,
            max_retries: 3,
            skew_threshold: DEFAULT_SKEW_THRESHOLD,
            auto_resync: false,
        }
    }

    /// Set the base URL (useful for testing with a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the path of the server time endpoint used by [`TradingClient::sync_clock`].
    pub fn server_time_path(mut self, path: impl Into<String>) -> Self {
        self.server_time_path = path.into();
        self
    }

    /// Set the credentials provider for authenticated requests.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the clock used for signing timestamps.
    ///
    /// Defaults to a [`SyncedClock`] so that [`TradingClient::sync_clock`] can
    /// correct drift.
    pub fn clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the maximum number of retries for transient failures.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Consecutive 401 responses after which [`CoinbaseError::ClockSkew`] is reported.
    pub fn skew_threshold(mut self, threshold: u32) -> Self {
        self.skew_threshold = threshold.max(1);
        self
    }

    /// Resynchronize the clock and retry once when clock skew is suspected.
    pub fn auto_resync(mut self, enabled: bool) -> Self {
        self.auto_resync = enabled;
        self
    }

    /// Build the client.
    pub fn build(self) -> TradingClient {
        // Build default headers.
        let mut headers = HeaderMap::new();
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("coinbase-request-signer/{}", env!("CARGO_PKG_VERSION")));
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("coinbase-request-signer"));
        headers.insert(USER_AGENT, header_value);

        // Build the HTTP client with middleware.
        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(self.max_retries);

        let client = ClientBuilder::new(reqwest_client)
            .with(TracingMiddleware::default())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SyncedClock::new()));
        let signer = self
            .credentials
            .map(|credentials| RequestSigner::new(credentials, Arc::clone(&clock)));

        TradingClient {
            http_client: client,
            base_url: self.base_url,
            server_time_path: self.server_time_path,
            signer,
            clock,
            rejections: Arc::new(AtomicU32::new(0)),
            skew_threshold: self.skew_threshold,
            auto_resync: self.auto_resync,
        }
    }
}

impl Default for TradingClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
