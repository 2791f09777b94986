use axum::{
    http::{HeaderMap, HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::auth::{CredentialVerifier, parse_basic_auth};
use crate::server::AppState;
use crate::types::User;

/// Every way a Git request can fail, each mapped to one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitError {
    /// Unknown owner or repository. Deliberately indistinguishable.
    NotFound,
    Unauthenticated,
    Forbidden,
    Upstream,
    Internal,
}

impl GitError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Upstream | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Not Found",
            Self::Unauthenticated => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::Upstream => "Failed to execute git command",
            Self::Internal => "Internal server error",
        }
    }

    pub fn requires_auth_header(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }
}

impl IntoResponse for GitError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), self.message()).into_response();

        if self.requires_auth_header() {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"Git Repository\""),
            );
        }

        response
    }
}

/// Resolves the actor from `Authorization: Basic` when no session supplied one.
///
/// Missing or invalid credentials are `Unauthenticated` so Git clients
/// prompt instead of giving up.
pub fn authenticate_basic(state: &AppState, headers: &HeaderMap) -> Result<User, GitError> {
    let Some(credentials) = parse_basic_auth(headers) else {
        debug!("Git request without Basic credentials");
        return Err(GitError::Unauthenticated);
    };

    let verifier = CredentialVerifier::new(state.store.as_ref(), &state.passwords);
    match verifier.authenticate(&credentials) {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            debug!(username = %credentials.username, "Basic authentication failed");
            Err(GitError::Unauthenticated)
        }
        Err(e) => {
            error!("Credential lookup failed: {e}");
            Err(GitError::Internal)
        }
    }
}
