mod server;

pub use server::{
    DEFAULT_CGI_TIMEOUT, INSECURE_DEV_SECRET, ServerConfig, resolve_signing_secret,
    resolve_signing_secret_from,
};
