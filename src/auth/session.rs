use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE_NAME: &str = "hypercommit_user_id";

/// Sessions expire one year after they were issued.
pub const SESSION_MAX_AGE_SECS: i64 = 365 * 24 * 60 * 60;

/// Signs and verifies the session cookie.
///
/// The cookie value is `{user_id}|{unix_timestamp}|{hex hmac}`, where the MAC
/// is HMAC-SHA256 over `{user_id}|{unix_timestamp}`.
#[derive(Clone)]
pub struct SessionSigner {
    secret: Vec<u8>,
}

impl SessionSigner {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[must_use]
    pub fn sign(&self, user_id: i64, now: DateTime<Utc>) -> String {
        let payload = format!("{user_id}|{}", now.timestamp());
        let signature = self.mac(&payload);
        format!("{payload}|{signature}")
    }

    /// Returns the user id carried by a valid, unexpired cookie value.
    #[must_use]
    pub fn verify(&self, value: &str, now: DateTime<Utc>) -> Option<i64> {
        let mut parts = value.splitn(3, '|');
        let user_id = parts.next()?;
        let issued_at = parts.next()?;
        let signature = parts.next()?;

        let expected = self.mac(&format!("{user_id}|{issued_at}"));
        if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            return None;
        }

        let user_id: i64 = user_id.parse().ok()?;
        let issued_at: i64 = issued_at.parse().ok()?;

        if now.timestamp() - issued_at > SESSION_MAX_AGE_SECS {
            return None;
        }

        Some(user_id)
    }
}

/// Finds the session cookie among the request's `Cookie` headers.
pub fn session_cookie_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value)
}
