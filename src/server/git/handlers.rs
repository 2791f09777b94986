use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{
        HeaderName,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::auth::{GitError, authenticate_basic};
use super::cgi::CgiRequest;
use super::owner::ResolvedOwner;
use crate::auth::{AuthContext, Decision, DenyReason, decide, parse_basic_auth, requires_actor};
use crate::server::AppState;
use crate::store::absolute_repository_path;
use crate::types::{Operation, Owner};

#[derive(Deserialize)]
pub struct InfoRefsQuery {
    service: Option<String>,
}

#[derive(Deserialize)]
pub struct GitPathParams {
    owner: String,
    repo: String,
}

const INFO_REFS: &str = "/info/refs";
const UPLOAD_PACK: &str = "/git-upload-pack";
const RECEIVE_PACK: &str = "/git-receive-pack";

fn strip_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

/// Ref advertisement is a read unless the client announces a push.
fn classify_info_refs(service: Option<&str>) -> Operation {
    match service {
        Some(service) if service.contains("receive-pack") => Operation::Write,
        _ => Operation::Read,
    }
}

pub async fn info_refs(
    State(state): State<Arc<AppState>>,
    ResolvedOwner(owner): ResolvedOwner,
    session: AuthContext,
    Path(params): Path<GitPathParams>,
    Query(query): Query<InfoRefsQuery>,
    request: Request,
) -> Response {
    let operation = classify_info_refs(query.service.as_deref());
    handle_git_operation(&state, owner, session, &params, operation, INFO_REFS, request).await
}

pub async fn git_upload_pack(
    State(state): State<Arc<AppState>>,
    ResolvedOwner(owner): ResolvedOwner,
    session: AuthContext,
    Path(params): Path<GitPathParams>,
    request: Request,
) -> Response {
    handle_git_operation(
        &state,
        owner,
        session,
        &params,
        Operation::Read,
        UPLOAD_PACK,
        request,
    )
    .await
}

pub async fn git_receive_pack(
    State(state): State<Arc<AppState>>,
    ResolvedOwner(owner): ResolvedOwner,
    session: AuthContext,
    Path(params): Path<GitPathParams>,
    request: Request,
) -> Response {
    handle_git_operation(
        &state,
        owner,
        session,
        &params,
        Operation::Write,
        RECEIVE_PACK,
        request,
    )
    .await
}

async fn handle_git_operation(
    state: &AppState,
    owner: Owner,
    session: AuthContext,
    params: &GitPathParams,
    operation: Operation,
    endpoint: &'static str,
    request: Request,
) -> Response {
    match dispatch(state, owner, session, params, operation, endpoint, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn dispatch(
    state: &AppState,
    owner: Owner,
    session: AuthContext,
    params: &GitPathParams,
    operation: Operation,
    endpoint: &'static str,
    request: Request,
) -> Result<Response, GitError> {
    let repo_name = strip_git_suffix(&params.repo);

    let repo = state
        .store
        .find_repository(owner, repo_name)
        .map_err(|e| {
            error!("Repository lookup failed: {e}");
            GitError::Internal
        })?
        .ok_or(GitError::NotFound)?;

    info!(
        owner = %params.owner,
        repo = %repo_name,
        operation = %operation,
        visibility = %repo.visibility,
        "Git request"
    );

    let actor = match session.actor {
        Some(user) => Some(user),
        None if requires_actor(&repo, operation) => {
            match authenticate_basic(state, request.headers()) {
                Ok(user) => Some(user),
                Err(GitError::Unauthenticated) => {
                    let attempted = parse_basic_auth(request.headers()).map(|c| c.username);
                    warn!(
                        username = %attempted.as_deref().unwrap_or("-"),
                        owner = %params.owner,
                        repo = %repo_name,
                        operation = %operation,
                        "Git authentication failed"
                    );
                    return Err(GitError::Unauthenticated);
                }
                Err(e) => return Err(e),
            }
        }
        None => None,
    };

    let decision = decide(&repo, actor.as_ref(), state.store.as_ref(), operation).map_err(|e| {
        error!("Access check failed: {e}");
        GitError::Internal
    })?;

    match decision {
        Decision::Allow(capability) => {
            debug!(capability = %capability, "Access granted");
        }
        Decision::Deny(reason) => {
            warn!(
                actor = actor.as_ref().map(|u| u.username.as_str()).unwrap_or("-"),
                owner = %params.owner,
                repo = %repo_name,
                operation = %operation,
                "Git access denied"
            );
            return Err(match reason {
                DenyReason::Unauthenticated => GitError::Unauthenticated,
                DenyReason::Forbidden => GitError::Forbidden,
            });
        }
    }

    let repository_path =
        absolute_repository_path(&state.repos_base_path, &repo).map_err(|e| {
            error!("Failed to resolve repository path: {e}");
            GitError::Internal
        })?;

    let (parts, body) = request.into_parts();
    let header_str = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let cgi_request = CgiRequest {
        repository_path,
        method: parts.method.to_string(),
        path_info: endpoint.to_string(),
        query_string: parts.uri.query().unwrap_or_default().to_string(),
        content_type: header_str(CONTENT_TYPE),
        content_length: header_str(CONTENT_LENGTH),
        remote_user: actor.map(|user| user.username),
        headers: parts.headers.clone(),
    };

    state.bridge.serve(cgi_request, body).await.map_err(|e| {
        error!(repo_id = repo.id, "git http-backend failed: {e}");
        GitError::Upstream
    })
}
