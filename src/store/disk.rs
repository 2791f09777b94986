use std::fs;
use std::path::Path;

use git2::{Repository, RepositoryInitOptions};

use crate::error::{Error, Result};

/// Creates a bare repository at `path` whose HEAD points at `default_branch`,
/// with pushes over smart HTTP enabled.
pub fn init_bare_repository(path: &Path, default_branch: &str) -> Result<()> {
    if path.exists() {
        return Err(Error::AlreadyExists);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut opts = RepositoryInitOptions::new();
    opts.bare(true)
        .mkpath(true)
        .initial_head(&format!("refs/heads/{default_branch}"));

    let repo = Repository::init_opts(path, &opts)?;
    repo.config()?.set_bool("http.receivepack", true)?;

    Ok(())
}

/// Removes a repository directory. A directory that is already gone is not an error.
pub fn remove_repository_dir(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}
