use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Generates a new access token.
/// Returns (raw_token, token_hash); only the hash may be persisted.
#[must_use]
pub fn generate_access_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let raw_token = URL_SAFE.encode(bytes);
    let hash = hash_access_token(&raw_token);
    (raw_token, hash)
}

/// Lowercase hex SHA-256 of the raw token string.
///
/// Tokens carry 256 bits of entropy, so a fast deterministic hash is enough
/// and allows an exact-match index lookup on every request.
#[must_use]
pub fn hash_access_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}
