//! Project API key generation and hashing
//!
//! Keys look like `pulse_sk_<uuid>`. Only the SHA-256 hex digest is stored;
//! the plaintext key is shown once when the project is created.

use uuid::Uuid;

use super::crypto::sha256_hex;
use crate::core::constants::API_KEY_PREFIX;

/// Generate a new opaque API key
pub fn generate_api_key() -> String {
    format!("{}{}", API_KEY_PREFIX, Uuid::new_v4())
}

/// Digest stored in `api_keys.key_hash`
pub fn hash_api_key(key: &str) -> String {
    sha256_hex(key)
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
