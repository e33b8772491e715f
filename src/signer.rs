//! Request signing for the authentication handshake.
//!
//! The server verifies an HMAC-SHA256 signature over a canonical
//! representation of the request, so the byte layout here is wire-critical:
//! percent-encode values with everything outside the unreserved set escaped,
//! sort the `key=value` pairs bytewise, join with `&`, then sign
//! `METHOD\nhost\npath\nquery` with the secret key and base64 the digest.

use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ClientError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_METHOD: &str = "HmacSHA256";
pub const SIGNATURE_VERSION: &str = "2.1";

/// UTC timestamp at second precision, ISO-8601 without a zone suffix.
/// Generated fresh for every auth attempt; never reused across reconnects.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// The parameter set the server expects to be covered by the signature.
/// `authType` is part of the auth request but deliberately not signed.
pub fn signed_params<'a>(access_key: &'a str, timestamp: &'a str) -> [(&'static str, &'a str); 4] {
    [
        ("accessKey", access_key),
        ("signatureMethod", SIGNATURE_METHOD),
        ("signatureVersion", SIGNATURE_VERSION),
        ("timestamp", timestamp),
    ]
}

/// Build the canonical query string: percent-encoded pairs, sorted bytewise.
fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();
    pairs.sort();
    pairs.join("&")
}

/// Compute the request signature. Pure and deterministic; the secret key is
/// never logged or stored beyond the HMAC computation.
pub fn sign(
    method: &str,
    host: &str,
    path: &str,
    params: &[(&str, &str)],
    secret_key: &str,
) -> Result<String, ClientError> {
    let payload = format!(
        "{}\n{}\n{}\n{}",
        method,
        host,
        path,
        canonical_query(params)
    );

    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| ClientError::Signature(e.to_string()))?;
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(base64::engine::general_purpose::STANDARD.encode(digest))
}
