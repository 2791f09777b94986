use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::git::{CgiBridge, CgiProcess, GitHttpBackend, git_router};
use crate::auth::{PasswordHasher, SessionSigner};
use crate::config::ServerConfig;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Root under which every repository directory lives.
    pub repos_base_path: PathBuf,
    pub sessions: SessionSigner,
    pub passwords: PasswordHasher,
    pub bridge: CgiBridge,
}

impl AppState {
    /// Builds state that runs the configured `git http-backend`.
    /// `config.signing_secret` must already be resolved.
    pub fn from_config(store: Arc<dyn Store>, config: &ServerConfig) -> Self {
        let backend = GitHttpBackend::new(config.git_binary.clone(), config.cgi_timeout);

        Self {
            store,
            repos_base_path: config.repos_path(),
            sessions: SessionSigner::new(config.signing_secret.clone()),
            passwords: PasswordHasher::new(),
            bridge: CgiBridge::new(Arc::new(backend), config.forward_cgi_status),
        }
    }

    /// Replaces the CGI process, keeping the status forwarding setting.
    #[must_use]
    pub fn with_cgi_process(mut self, process: Arc<dyn CgiProcess>) -> Self {
        self.bridge = CgiBridge::new(process, self.bridge.forward_status());
        self
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(git_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
