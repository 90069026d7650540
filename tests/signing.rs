use std::sync::Arc;
use std::thread;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use coinbase_request_signer::auth::{
    CB_ACCESS_KEY, CB_ACCESS_PASSPHRASE, CB_ACCESS_SIGN, CB_ACCESS_TIMESTAMP, Credentials,
    CredentialsConfig, FixedClock, RequestSigner, SigningRequest,
};
use coinbase_request_signer::{AuthStrategy, CoinbaseError};

const TIMESTAMP: u64 = 1_700_000_000;
const ACCOUNTS_PATH: &str = "/api/v3/brokerage/accounts";

fn signer(credentials: Credentials) -> RequestSigner {
    RequestSigner::new(Arc::new(credentials), Arc::new(FixedClock(TIMESTAMP)))
}

fn reference_signature(key: &[u8], message: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(message.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

#[test]
fn test_end_to_end_modern_accounts_request() {
    let secret = BASE64.encode([1u8, 2, 3]);
    let request = SigningRequest::new("GET", ACCOUNTS_PATH, "", TIMESTAMP);
    assert_eq!(
        request.canonical_message(),
        "1700000000GET/api/v3/brokerage/accounts"
    );

    let headers = signer(Credentials::modern("k1", secret))
        .sign_request(&request)
        .unwrap();

    let expected = reference_signature(&[1, 2, 3], "1700000000GET/api/v3/brokerage/accounts");
    assert_eq!(expected, "jRfyT0RZK70DLI28Apuj1Yz4ktA/IVcRphLKZKcOf8Q=");
    assert_eq!(headers.get(CB_ACCESS_SIGN), Some(expected.as_str()));
    assert_eq!(headers.get(CB_ACCESS_KEY), Some("k1"));
    assert_eq!(headers.get(CB_ACCESS_TIMESTAMP), Some("1700000000"));
    assert_eq!(headers.len(), 3);
}

#[test]
fn test_passphrase_header_by_strategy() {
    let bodies = ["", "{}", r#"{"product_id":"BTC-USD"}"#];
    let methods = ["GET", "POST", "DELETE"];

    let modern = signer(Credentials::modern("k", "c2VjcmV0"));
    let legacy = signer(Credentials::legacy("k", "secret", "pass"));

    for method in methods {
        for body in bodies {
            let headers = modern.sign(method, ACCOUNTS_PATH, body).unwrap();
            assert!(!headers.contains(CB_ACCESS_PASSPHRASE));

            let headers = legacy.sign(method, ACCOUNTS_PATH, body).unwrap();
            let passphrases = headers
                .iter()
                .filter(|(name, _)| *name == CB_ACCESS_PASSPHRASE)
                .count();
            assert_eq!(passphrases, 1);
        }
    }
}

#[test]
fn test_modern_ignores_stale_passphrase() {
    let config = CredentialsConfig::from_json(
        r#"{"api_key":"k","api_secret":"AQID","passphrase":"old","strategy":"modern"}"#,
    )
    .unwrap();
    let headers = signer(Credentials::load(&config).unwrap())
        .sign("GET", ACCOUNTS_PATH, "")
        .unwrap();

    assert!(!headers.contains(CB_ACCESS_PASSPHRASE));
    assert!(headers.iter().all(|(_, value)| value != "old"));
}

#[test]
fn test_signing_is_deterministic() {
    let signer = signer(Credentials::legacy("k", "secret", "pass"));
    let first = signer.sign("POST", "/orders", r#"{"size":"1"}"#).unwrap();
    let second = signer.sign("POST", "/orders", r#"{"size":"1"}"#).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_single_byte_changes_signature() {
    let signer = signer(Credentials::modern("k", "c2VjcmV0"));
    let base_path = "/api/v3/brokerage/orders/historical/batch";
    let base_body = r#"{"client_order_id":"abc","size":"0.01"}"#;
    let baseline = signer.sign("POST", base_path, base_body).unwrap();
    let baseline_sig = baseline.get(CB_ACCESS_SIGN).unwrap();

    for i in 0..base_path.len() {
        let mut bytes = base_path.as_bytes().to_vec();
        bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
        let path = String::from_utf8(bytes).unwrap();
        let headers = signer.sign("POST", &path, base_body).unwrap();
        assert_ne!(headers.get(CB_ACCESS_SIGN).unwrap(), baseline_sig, "path byte {i}");
    }

    for i in 0..base_body.len() {
        let mut bytes = base_body.as_bytes().to_vec();
        bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
        let body = String::from_utf8(bytes).unwrap();
        let headers = signer.sign("POST", base_path, &body).unwrap();
        assert_ne!(headers.get(CB_ACCESS_SIGN).unwrap(), baseline_sig, "body byte {i}");
    }
}

#[test]
fn test_strategies_decode_secret_differently() {
    // The same secret string signs differently under each strategy.
    let modern = signer(Credentials::modern("k", "AQID"));
    let legacy = signer(Credentials::legacy("k", "AQID", "pass"));

    let modern_sig = modern.sign("GET", ACCOUNTS_PATH, "").unwrap();
    let legacy_sig = legacy.sign("GET", ACCOUNTS_PATH, "").unwrap();
    assert_ne!(modern_sig.get(CB_ACCESS_SIGN), legacy_sig.get(CB_ACCESS_SIGN));
    assert_eq!(
        legacy_sig.get(CB_ACCESS_SIGN).unwrap(),
        reference_signature(b"AQID", "1700000000GET/api/v3/brokerage/accounts")
    );
}

#[test]
fn test_modern_rejects_non_base64_secret() {
    let err = signer(Credentials::modern("k", "not-base64!!"))
        .sign("GET", ACCOUNTS_PATH, "")
        .unwrap_err();
    assert!(matches!(err, CoinbaseError::InvalidSecretEncoding(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_legacy_load_without_passphrase_fails() {
    let config = CredentialsConfig {
        api_key: Some("k".into()),
        api_secret: Some("secret".into()),
        passphrase: None,
        strategy: AuthStrategy::Legacy,
    };
    assert!(matches!(
        Credentials::load(&config),
        Err(CoinbaseError::MissingCredential { field: "passphrase" })
    ));
}

#[test]
fn test_concurrent_signing_matches_sequential() {
    let signer = Arc::new(signer(Credentials::legacy("k", "secret", "pass")));
    let paths: Vec<String> = (0..64).map(|i| format!("/orders/{i}")).collect();

    let sequential: Vec<_> = paths
        .iter()
        .map(|path| signer.sign("GET", path, "").unwrap())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let signer = Arc::clone(&signer);
            let paths = paths.clone();
            thread::spawn(move || {
                paths
                    .iter()
                    .map(|path| signer.sign("GET", path, "").unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), sequential);
    }
}
