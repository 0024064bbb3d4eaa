//! Security utilities for admin key hashing and webhook payload signing.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC signature of a webhook body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Hashes an API key using SHA-256.
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}

/// Verifies an API key against a stored hash using constant-time comparison.
pub fn verify_api_key(input: &str, stored_hash: &str) -> bool {
    let input_hash = hash_api_key(input);
    input_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Signs a webhook payload using HMAC-SHA256, hex encoded.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook signature using constant-time comparison.
///
/// Accepts a bare hex digest or one prefixed with `sha256=`; both the
/// prefix and the digest are matched case-insensitively.
pub fn verify_payload_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let provided = signature.trim().to_ascii_lowercase();
    let provided = provided.strip_prefix("sha256=").unwrap_or(&provided);
    let expected = sign_payload(payload, secret);
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}
