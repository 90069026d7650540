//! Error types for request signing and the trading transport.

use serde::Deserialize;
use thiserror::Error;

/// The main error type for all signing and transport operations.
#[derive(Error, Debug)]
pub enum CoinbaseError {
    /// A required credential is absent from the configuration.
    #[error("Missing credential: {field}")]
    MissingCredential {
        /// Name of the missing field (e.g., "api_key", "passphrase")
        field: &'static str,
    },

    /// The API secret is not valid for the configured strategy.
    #[error("Invalid secret encoding: {0}")]
    InvalidSecretEncoding(String),

    /// The configuration could not be interpreted.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A header value could not be placed into an HTTP request.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// HMAC key setup failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Repeated authentication rejections point at a drifted clock.
    #[error("Clock skew suspected after {rejections} rejected request(s), resynchronize the clock")]
    ClockSkew {
        /// Consecutive rejections observed when the skew was reported
        rejections: u32,
    },

    /// The exchange rejected the request's credentials or signature.
    #[error("Unauthorized: {0}")]
    Unauthorized(ApiError),

    /// The exchange returned a non-success status.
    #[error("Coinbase API error: {0}")]
    Api(ApiError),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_ms:?}ms")]
    RateLimitExceeded {
        /// Suggested wait time in milliseconds before retrying
        retry_after_ms: Option<u64>,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CoinbaseError {
    /// Whether the caller may reasonably retry.
    ///
    /// Signing failures never are: the same inputs produce the same failure.
    /// `ClockSkew` is retryable only after the clock has been resynchronized.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::ClockSkew { .. }
        )
    }
}

/// Error reported by the exchange in a non-success response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Error identifier (e.g., "UNAUTHENTICATED"); empty for legacy bodies
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.code.is_empty() {
            write!(f, "HTTP {}: {}", self.status, self.message)
        } else {
            write!(f, "HTTP {} {}: {}", self.status, self.code, self.message)
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_details: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Parse an error from a response body.
    ///
    /// Understands `{"error", "message", "error_details"}` and the older
    /// `{"message"}` shape. Anything else becomes the message verbatim.
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => {
                let message = match (parsed.message, parsed.error_details) {
                    (Some(m), Some(d)) if !d.is_empty() && d != m => format!("{m} ({d})"),
                    (Some(m), _) => m,
                    (None, Some(d)) => d,
                    (None, None) => String::new(),
                };
                Self::new(status, parsed.error.unwrap_or_default(), message)
            }
            Err(_) => Self::new(status, "", body.trim()),
        }
    }

    /// Check if this is a 401 rejection.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401 || self.code == "UNAUTHENTICATED"
    }

    /// Check if the exchange complained about the signature.
    pub fn is_invalid_signature(&self) -> bool {
        self.message.to_ascii_lowercase().contains("invalid signature")
    }

    /// Check if the exchange rejected the request timestamp.
    pub fn is_timestamp_rejection(&self) -> bool {
        let message = self.message.to_ascii_lowercase();
        message.contains("timestamp") && (message.contains("expired") || message.contains("skew"))
    }
}
