mod auth;
mod cgi;
mod handlers;
mod owner;
mod process;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

pub use auth::GitError;
pub use cgi::{CgiBridge, CgiRequest, CgiResponse, parse_cgi_output};
pub use owner::ResolvedOwner;
pub use process::{CgiError, CgiProcess, GitHttpBackend};

use crate::server::AppState;

pub fn git_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{owner}/{repo}/info/refs", get(handlers::info_refs))
        .route(
            "/{owner}/{repo}/git-upload-pack",
            post(handlers::git_upload_pack),
        )
        .route(
            "/{owner}/{repo}/git-receive-pack",
            post(handlers::git_receive_pack),
        )
}
