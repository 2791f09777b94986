use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Upper bound on a single `git http-backend` invocation.
pub const DEFAULT_CGI_TIMEOUT: Duration = Duration::from_secs(300);

/// Session signing key used when nothing else is configured. Never use in production.
pub const INSECURE_DEV_SECRET: &str = "insecure-dev-secret";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Root directory for bare repositories. Defaults to `{data_dir}/repos`.
    pub repos_base_path: Option<PathBuf>,
    pub signing_secret: String,
    /// Executable used to run `http-backend`.
    pub git_binary: String,
    pub cgi_timeout: Duration,
    /// Propagate the CGI `Status:` code instead of always answering 200.
    pub forward_cgi_status: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("hypercommit.db")
    }

    #[must_use]
    pub fn repos_path(&self) -> PathBuf {
        self.repos_base_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("repos"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            data_dir: PathBuf::from("./data"),
            repos_base_path: None,
            signing_secret: INSECURE_DEV_SECRET.to_string(),
            git_binary: "git".to_string(),
            cgi_timeout: DEFAULT_CGI_TIMEOUT,
            forward_cgi_status: false,
        }
    }
}

/// Resolves the session signing secret, preferring a systemd credential
/// (`$CREDENTIALS_DIRECTORY/signing_secret`) over the configured value.
pub fn resolve_signing_secret(configured: Option<String>) -> Result<String> {
    let credentials_dir = env::var_os("CREDENTIALS_DIRECTORY").map(PathBuf::from);
    resolve_signing_secret_from(credentials_dir.as_deref(), configured)
}

pub fn resolve_signing_secret_from(
    credentials_dir: Option<&Path>,
    configured: Option<String>,
) -> Result<String> {
    if let Some(dir) = credentials_dir {
        let path = dir.join("signing_secret");
        if path.exists() {
            let secret = fs::read_to_string(&path)?.trim().to_string();
            if secret.is_empty() {
                return Err(Error::Config(format!(
                    "signing secret file {} is empty",
                    path.display()
                )));
            }
            return Ok(secret);
        }
    }

    match configured {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => {
            warn!("No signing secret configured, using an insecure development secret");
            Ok(INSECURE_DEV_SECRET.to_string())
        }
    }
}
