use tracing::{debug, warn};

use super::basic::BasicCredentials;
use super::password::PasswordHasher;
use super::token::hash_access_token;
use crate::error::Result;
use crate::store::Store;
use crate::types::{AccessToken, User};

/// Checks presented secrets against stored credentials.
///
/// Denials are `Ok(None)` / `false`; only store failures are errors.
pub struct CredentialVerifier<'a> {
    store: &'a dyn Store,
    passwords: &'a PasswordHasher,
}

impl<'a> CredentialVerifier<'a> {
    pub fn new(store: &'a dyn Store, passwords: &'a PasswordHasher) -> Self {
        Self { store, passwords }
    }

    #[must_use]
    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        self.passwords.verify(plaintext, stored_hash)
    }

    /// Looks up a raw token by its hash and records the use.
    pub fn verify_access_token(&self, raw_token: &str) -> Result<Option<AccessToken>> {
        let token = self.find_access_token(raw_token)?;
        if let Some(token) = &token {
            self.touch(token);
        }
        Ok(token)
    }

    /// Resolves Basic credentials to a user.
    ///
    /// The secret is tried as the account password first, then as an access
    /// token belonging to that same account.
    pub fn authenticate(&self, credentials: &BasicCredentials) -> Result<Option<User>> {
        let Some(user) = self.store.get_user_by_username(&credentials.username)? else {
            debug!("Basic auth for unknown user");
            return Ok(None);
        };

        if let Some(hash) = user.password_hash.as_deref() {
            if self.verify_password(&credentials.password, hash) {
                return Ok(Some(user));
            }
        }

        match self.find_access_token(&credentials.password)? {
            Some(token) if token.user_id == user.id => {
                self.touch(&token);
                Ok(Some(user))
            }
            Some(_) => {
                debug!(user_id = user.id, "Access token belongs to another user");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn find_access_token(&self, raw_token: &str) -> Result<Option<AccessToken>> {
        self.store
            .find_access_token_by_hash(&hash_access_token(raw_token))
    }

    fn touch(&self, token: &AccessToken) {
        if let Err(e) = self.store.update_access_token_last_used(token.id) {
            warn!("Failed to update token last_used_at: {e}");
        }
    }
}
