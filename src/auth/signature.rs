//! HMAC-SHA256 signature generation.
//!
//! Both authentication schemes sign the canonical message the same way:
//!
//! ```text
//! base64(HMAC-SHA256(key = secret bytes, message = timestamp + METHOD + path + body))
//! ```
//!
//! They differ only in how the secret bytes are obtained, which is handled by
//! [`AuthStrategy::decode_secret`](crate::auth::AuthStrategy::decode_secret).

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoinbaseError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the raw HMAC-SHA256 of `message` keyed with `secret`.
pub fn sign(secret: &[u8], message: &str) -> Result<Vec<u8>, CoinbaseError> {
    let mut hmac = HmacSha256::new_from_slice(secret)
        .map_err(|e| CoinbaseError::Auth(format!("Invalid HMAC key: {e}")))?;
    hmac.update(message.as_bytes());
    Ok(hmac.finalize().into_bytes().to_vec())
}

/// Compute the signature and encode it as base64 header text.
///
/// # Example
///
/// ```rust
/// use coinbase_request_signer::auth::sign_base64;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let signature = sign_base64(&[1, 2, 3], "1700000000GET/api/v3/brokerage/accounts")?;
/// assert_eq!(signature, "jRfyT0RZK70DLI28Apuj1Yz4ktA/IVcRphLKZKcOf8Q=");
/// # Ok(())
/// # }
/// ```
pub fn sign_base64(secret: &[u8], message: &str) -> Result<String, CoinbaseError> {
    sign(secret, message).map(|bytes| BASE64.encode(bytes))
}
