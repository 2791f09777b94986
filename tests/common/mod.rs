#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use tempfile::TempDir;
use tower::ServiceExt;

use hypercommit::auth::{PasswordHasher, SessionSigner, generate_access_token};
use hypercommit::config::ServerConfig;
use hypercommit::server::{AppState, CgiError, CgiProcess, CgiRequest, create_router};
use hypercommit::store::{SqliteStore, Store};
use hypercommit::types::{NewRepository, Organization, Owner, Repository, User, Visibility};

pub const SIGNING_SECRET: &str = "test-signing-secret";

pub const ADVERTISEMENT: &[u8] = b"Content-Type: application/x-git-upload-pack-advertisement\r\nCache-Control: no-cache\r\n\r\n001e# service=git-upload-pack\n0000";

/// One recorded invocation of the fake backend.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub repository_path: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdin: Vec<u8>,
}

impl RecordedCall {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Output(Vec<u8>),
    Exit(String),
    TimedOut,
}

/// Stands in for `git http-backend`: records its input and returns canned output.
pub struct FakeCgi {
    outcome: Mutex<Outcome>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeCgi {
    pub fn new(output: &[u8]) -> Self {
        Self {
            outcome: Mutex::new(Outcome::Output(output.to_vec())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_output(&self, output: &[u8]) {
        *self.outcome.lock().unwrap() = Outcome::Output(output.to_vec());
    }

    pub fn fail_with(&self, stderr: &str) {
        *self.outcome.lock().unwrap() = Outcome::Exit(stderr.to_string());
    }

    pub fn time_out(&self) {
        *self.outcome.lock().unwrap() = Outcome::TimedOut;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().pop().expect("backend was not invoked")
    }
}

#[async_trait]
impl CgiProcess for FakeCgi {
    async fn run(&self, request: &CgiRequest, stdin: Body) -> Result<Vec<u8>, CgiError> {
        let stdin = to_bytes(stdin, usize::MAX)
            .await
            .map_err(io::Error::other)?;

        self.calls.lock().unwrap().push(RecordedCall {
            repository_path: request.repository_path.clone(),
            env: request.environment(),
            stdin: stdin.to_vec(),
        });

        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            Outcome::Output(output) => Ok(output),
            Outcome::Exit(stderr) => Err(CgiError::Exit {
                code: Some(128),
                stderr,
            }),
            Outcome::TimedOut => Err(CgiError::TimedOut(Duration::from_secs(300))),
        }
    }
}

pub struct Harness {
    pub temp: TempDir,
    pub store: Arc<SqliteStore>,
    pub cgi: Arc<FakeCgi>,
    pub router: Router,
    pub passwords: PasswordHasher,
    pub config: ServerConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let mut config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            signing_secret: SIGNING_SECRET.to_string(),
            ..Default::default()
        };
        configure(&mut config);

        let store = Arc::new(SqliteStore::new(config.db_path()).expect("open store"));
        store.initialize().expect("initialize store");

        let cgi = Arc::new(FakeCgi::new(ADVERTISEMENT));
        let state = AppState::from_config(store.clone(), &config).with_cgi_process(cgi.clone());
        let router = create_router(Arc::new(state));

        Self {
            temp,
            store,
            cgi,
            router,
            passwords: PasswordHasher::new(),
            config,
        }
    }

    pub fn create_user(&self, username: &str, password: Option<&str>) -> User {
        let hash = password.map(|p| self.passwords.hash(p).unwrap());
        self.store
            .create_user(username, "", hash.as_deref())
            .unwrap()
    }

    pub fn create_org(&self, username: &str, members: &[&User]) -> Organization {
        let org = self.store.create_organization(username, "").unwrap();
        for member in members {
            self.store.add_organization_member(org.id, member.id).unwrap();
        }
        org
    }

    pub fn create_repo(&self, owner: Owner, name: &str, visibility: Visibility) -> Repository {
        self.store
            .create_repository(&NewRepository {
                name: name.to_string(),
                description: None,
                default_branch: "main".to_string(),
                visibility,
                owner,
            })
            .unwrap()
    }

    /// Issues a token and returns the raw value.
    pub fn create_token(&self, user: &User) -> (i64, String) {
        let (raw, hash) = generate_access_token();
        let token = self.store.create_access_token(user.id, "test", &hash).unwrap();
        (token.id, raw)
    }

    pub fn session_cookie(&self, user: &User) -> String {
        let value = SessionSigner::new(SIGNING_SECRET).sign(user.id, Utc::now());
        format!("hypercommit_user_id={value}")
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn basic_auth(username: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{secret}")))
}

pub fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

pub fn post(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("POST").uri(uri)
}

pub fn info_refs(owner: &str, repo: &str, service: &str) -> axum::http::request::Builder {
    get(&format!("/{owner}/{repo}/info/refs?service={service}"))
}

pub fn receive_pack(owner: &str, repo: &str) -> axum::http::request::Builder {
    post(&format!("/{owner}/{repo}/git-receive-pack"))
        .header(header::CONTENT_TYPE, "application/x-git-receive-pack-request")
}

pub fn upload_pack(owner: &str, repo: &str) -> axum::http::request::Builder {
    post(&format!("/{owner}/{repo}/git-upload-pack"))
        .header(header::CONTENT_TYPE, "application/x-git-upload-pack-request")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub fn assert_challenge(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"Git Repository\""
    );
}

/// Collects formatted log output for the current thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    /// Installs a subscriber writing into this buffer until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}
