use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{debug, error};

use super::session::session_cookie_value;
use crate::server::AppState;
use crate::types::User;

/// The actor identified by the session cookie, if any.
///
/// A missing, malformed, forged or expired cookie yields an anonymous
/// context rather than a rejection.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub actor: Option<User>,
}

impl AuthContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { actor: None }
    }
}

#[derive(Debug)]
pub struct SessionLookupFailed;

impl IntoResponse for SessionLookupFailed {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = SessionLookupFailed;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = session_cookie_value(&parts.headers) else {
            return Ok(Self::anonymous());
        };

        let Some(user_id) = state.sessions.verify(value, Utc::now()) else {
            debug!("Ignoring invalid session cookie");
            return Ok(Self::anonymous());
        };

        let actor = state.store.get_user(user_id).map_err(|e| {
            error!("Failed to load session user: {e}");
            SessionLookupFailed
        })?;

        Ok(Self { actor })
    }
}
