//! HMAC-SHA256 signature generation for Bitkub API requests.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The string Bitkub signs: `timestamp + METHOD + path + body`.
///
/// `path` includes any query string; `body` is the exact JSON sent, or empty.
pub fn payload(timestamp_ms: u64, method: &str, path: &str, body: &str) -> String {
    format!("{timestamp_ms}{}{path}{body}", method.to_ascii_uppercase())
}

/// Sign a payload with HMAC-SHA256.
///
/// Returns the hex-encoded signature for the `X-BTK-SIGN` header.
pub fn sign(payload: &str, secret_key: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret_key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}
