use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found")]
    NotFound,

    /// Unique constraint hit: username, repository name, or token hash.
    #[error("already exists")]
    AlreadyExists,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid visibility: {0}")]
    InvalidVisibility(String),
}

pub type Result<T> = std::result::Result<T, Error>;
