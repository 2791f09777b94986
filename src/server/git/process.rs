use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use futures_util::TryStreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::cgi::CgiRequest;

#[derive(Debug, Error)]
pub enum CgiError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("cgi i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("cgi process exited with {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("cgi process timed out after {0:?}")]
    TimedOut(Duration),
}

/// One CGI invocation: environment and stdin in, raw stdout out.
///
/// A non-zero exit is an error; successful output still carries the CGI
/// header block and is parsed by the caller.
#[async_trait]
pub trait CgiProcess: Send + Sync {
    async fn run(&self, request: &CgiRequest, stdin: Body) -> Result<Vec<u8>, CgiError>;
}

/// Runs `git http-backend` as a child process per request.
#[derive(Debug, Clone)]
pub struct GitHttpBackend {
    git_binary: String,
    timeout: Duration,
}

impl GitHttpBackend {
    pub fn new(git_binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            git_binary: git_binary.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CgiProcess for GitHttpBackend {
    async fn run(&self, request: &CgiRequest, stdin: Body) -> Result<Vec<u8>, CgiError> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.arg("http-backend")
            .current_dir(&request.repository_path)
            .envs(request.environment())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| CgiError::Spawn {
            program: self.git_binary.clone(),
            source,
        })?;

        let child_stdin = child.stdin.take();
        let feed = async move {
            let Some(mut child_stdin) = child_stdin else {
                return Ok(());
            };
            let reader = StreamReader::new(stdin.into_data_stream().map_err(io::Error::other));
            tokio::pin!(reader);
            tokio::io::copy(&mut reader, &mut child_stdin).await?;
            child_stdin.shutdown().await
        };

        let run = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            if let Err(e) = fed {
                // The backend may exit before consuming the whole body
                debug!("Failed to stream request body to http-backend: {e}");
            }
            output
        };

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| CgiError::TimedOut(self.timeout))??;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(CgiError::Exit {
                code: output.status.code(),
                stderr,
            });
        }

        if !stderr.is_empty() {
            debug!("http-backend stderr: {stderr}");
        }

        Ok(output.stdout)
    }
}
