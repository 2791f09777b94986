use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::error;

use super::auth::GitError;
use crate::server::AppState;
use crate::types::Owner;

/// The account named by the `{owner}` path segment.
///
/// Users are matched before organizations; an unknown name is a plain 404.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedOwner(pub Owner);

impl FromRequestParts<Arc<AppState>> for ResolvedOwner {
    type Rejection = GitError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|_| GitError::NotFound)?;
        let name = params.get("owner").ok_or(GitError::NotFound)?;

        let internal = |e: crate::error::Error| {
            error!("Owner lookup failed: {e}");
            GitError::Internal
        };

        if let Some(user) = state.store.get_user_by_username(name).map_err(internal)? {
            return Ok(Self(Owner::User(user.id)));
        }

        if let Some(org) = state
            .store
            .get_organization_by_username(name)
            .map_err(internal)?
        {
            return Ok(Self(Owner::Organization(org.id)));
        }

        Err(GitError::NotFound)
    }
}
