use std::path::{Path, PathBuf};

use crate::types::{Owner, Repository};

/// Returns the on-disk location of a repository.
///
/// Repositories are keyed by numeric ids rather than names so renames never
/// move directories: `{base}/{owner_segment}/{repository_id}`.
pub fn repository_path(base: &Path, owner: Owner, repository_id: i64) -> PathBuf {
    base.join(owner.path_segment())
        .join(repository_id.to_string())
}

/// Like [`repository_path`], made absolute against the current directory
/// when `base` is relative.
pub fn absolute_repository_path(base: &Path, repo: &Repository) -> std::io::Result<PathBuf> {
    let path = repository_path(base, repo.owner, repo.id);
    if path.is_absolute() {
        Ok(path)
    } else {
        std::path::absolute(path)
    }
}
