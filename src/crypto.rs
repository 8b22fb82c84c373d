//! Tuya cloud signing primitives.
//! HMAC-SHA256 request signatures and SHA-256 body digests.

use crate::error::{Result, TuyaError};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Computes the HMAC-SHA256 of `message` keyed by `secret`, rendered as uppercase hex.
pub fn sign(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| TuyaError::Configuration("invalid secret key".to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Lowercase hex SHA-256 digest of a request body.
pub fn content_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
