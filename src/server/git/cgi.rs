//! HTTP <-> CGI translation for `git http-backend`.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::debug;

use super::process::{CgiError, CgiProcess};

/// Everything the subprocess needs to know about one HTTP request.
#[derive(Debug, Clone)]
pub struct CgiRequest {
    /// Absolute path of the bare repository; also the working directory.
    pub repository_path: PathBuf,
    pub method: String,
    pub path_info: String,
    pub query_string: String,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub remote_user: Option<String>,
    pub headers: HeaderMap,
}

impl CgiRequest {
    /// CGI environment variables for this request.
    #[must_use]
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = vec![
            (
                "GIT_PROJECT_ROOT".to_string(),
                self.repository_path.to_string_lossy().into_owned(),
            ),
            ("GIT_HTTP_EXPORT_ALL".to_string(), "1".to_string()),
            ("PATH_INFO".to_string(), self.path_info.clone()),
            ("REQUEST_METHOD".to_string(), self.method.clone()),
            ("QUERY_STRING".to_string(), self.query_string.clone()),
            (
                "CONTENT_TYPE".to_string(),
                self.content_type.clone().unwrap_or_default(),
            ),
        ];

        if let Some(length) = &self.content_length {
            env.push(("CONTENT_LENGTH".to_string(), length.clone()));
        }
        if let Some(user) = &self.remote_user {
            env.push(("REMOTE_USER".to_string(), user.clone()));
        }

        for name in self.headers.keys() {
            let values: Vec<&str> = self
                .headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .collect();
            if values.is_empty() {
                continue;
            }
            env.push((header_env_name(name.as_str()), values.join(", ")));
        }

        env
    }
}

/// `Content-Type` becomes `HTTP_CONTENT_TYPE`.
fn header_env_name(name: &str) -> String {
    format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"))
}

/// Parsed CGI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiResponse {
    /// Code from the `Status:` pseudo-header, when present and well formed.
    pub status: Option<u16>,
    /// Every other header, in output order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// No header/body separator was found; `body` holds the raw output.
    pub unframed: bool,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits CGI output into headers and body.
///
/// The header block ends at the first blank line, written either as
/// `\r\n\r\n` or as `\n\n`.
#[must_use]
pub fn parse_cgi_output(output: Vec<u8>) -> CgiResponse {
    let crlf = find(&output, b"\r\n\r\n").map(|idx| (idx, 4));
    let lf = find(&output, b"\n\n").map(|idx| (idx, 2));

    let separator = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    let Some((idx, len)) = separator else {
        return CgiResponse {
            status: None,
            headers: Vec::new(),
            body: Bytes::from(output),
            unframed: true,
        };
    };

    let header_block = String::from_utf8_lossy(&output[..idx]);
    let mut status = None;
    let mut headers = Vec::new();

    for line in header_block.split('\n') {
        let line = line.trim();
        let Some(colon) = line.find(':') else {
            continue;
        };
        if colon == 0 {
            continue;
        }

        let name = line[..colon].trim();
        let value = line[colon + 1..].trim();

        if name.eq_ignore_ascii_case("status") {
            status = value
                .split_whitespace()
                .next()
                .and_then(|code| code.parse().ok());
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let body = Bytes::from(output).slice(idx + len..);

    CgiResponse {
        status,
        headers,
        body,
        unframed: false,
    }
}

/// Runs one CGI round trip and turns the output into an HTTP response.
#[derive(Clone)]
pub struct CgiBridge {
    process: Arc<dyn CgiProcess>,
    forward_status: bool,
}

impl CgiBridge {
    pub fn new(process: Arc<dyn CgiProcess>, forward_status: bool) -> Self {
        Self {
            process,
            forward_status,
        }
    }

    #[must_use]
    pub fn forward_status(&self) -> bool {
        self.forward_status
    }

    pub async fn serve(&self, request: CgiRequest, body: Body) -> Result<Response, CgiError> {
        let output = self.process.run(&request, body).await?;
        Ok(self.translate(parse_cgi_output(output)))
    }

    /// Builds the client response. Unless status forwarding is enabled, the
    /// response is always 200 whatever `Status:` the backend reported.
    #[must_use]
    pub fn translate(&self, cgi: CgiResponse) -> Response {
        if cgi.unframed {
            return (StatusCode::OK, cgi.body).into_response();
        }

        let status = match cgi.status {
            Some(code) if self.forward_status => {
                StatusCode::from_u16(code).unwrap_or(StatusCode::OK)
            }
            Some(code) if code != 200 => {
                debug!(code, "Answering 200 despite CGI status");
                StatusCode::OK
            }
            _ => StatusCode::OK,
        };

        let mut response = (status, cgi.body).into_response();
        let headers = response.headers_mut();
        for (name, value) in cgi.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => debug!(header = %name, "Skipping invalid CGI header"),
            }
        }

        response
    }
}
