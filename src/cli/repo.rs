use std::path::PathBuf;

use serde::Serialize;

use crate::error::Error;
use crate::server::validation::validate_repository_name;
use crate::store::{Store, init_bare_repository, remove_repository_dir, repository_path};
use crate::types::{NewRepository, Owner, Repository, Role, Visibility};

use super::{init_store, require_user, resolve_owner};

fn require_repository(
    store: &dyn Store,
    owner: &str,
    name: &str,
) -> anyhow::Result<Repository> {
    let owner_id = resolve_owner(store, owner)?;
    store
        .find_repository(owner_id, name)?
        .ok_or_else(|| anyhow::anyhow!("Repository '{}/{}' not found", owner, name))
}

fn repos_base(data_dir: &str, repos_path: Option<String>) -> PathBuf {
    repos_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(data_dir).join("repos"))
}

#[allow(clippy::too_many_arguments)]
pub fn run_repo_create(
    data_dir: String,
    repos_path: Option<String>,
    owner: String,
    name: String,
    visibility: Visibility,
    default_branch: String,
    description: Option<String>,
    creator: Option<String>,
) -> anyhow::Result<()> {
    validate_repository_name(&name).map_err(anyhow::Error::msg)?;
    let store = init_store(&data_dir)?;

    let owner_id = resolve_owner(&store, &owner)?;
    let creator = creator
        .map(|username| require_user(&store, &username))
        .transpose()?;

    let repo = match store.create_repository(&NewRepository {
        name: name.clone(),
        description,
        default_branch: default_branch.clone(),
        visibility,
        owner: owner_id,
    }) {
        Ok(repo) => repo,
        Err(Error::AlreadyExists) => {
            anyhow::bail!("Repository '{}/{}' already exists", owner, name)
        }
        Err(e) => return Err(e.into()),
    };

    let path = repository_path(&repos_base(&data_dir, repos_path), repo.owner, repo.id);

    if let Err(e) = init_bare_repository(&path, &default_branch) {
        // An existing directory belongs to someone else; anything else is ours to clean up
        if !matches!(e, Error::AlreadyExists) {
            if let Err(cleanup) = remove_repository_dir(&path) {
                eprintln!("Warning: could not remove {}: {}", path.display(), cleanup);
            }
        }
        store.delete_repository(repo.id)?;
        anyhow::bail!("Failed to initialize {}: {}", path.display(), e);
    }

    if let Some(creator) = &creator {
        store.upsert_contributor(repo.id, creator.id, Role::Admin)?;
    }

    println!(
        "Created {} repository \"{}/{}\" at {}",
        repo.visibility,
        owner,
        repo.name,
        path.display()
    );
    Ok(())
}

pub fn run_repo_delete(
    data_dir: String,
    repos_path: Option<String>,
    owner: String,
    name: String,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let repo = require_repository(&store, &owner, &name)?;

    if !yes {
        let confirmed = inquire::Confirm::new(&format!("Delete repository '{}/{}'?", owner, name))
            .with_default(false)
            .prompt()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let path = repository_path(&repos_base(&data_dir, repos_path), repo.owner, repo.id);
    store.delete_repository(repo.id)?;
    remove_repository_dir(&path)?;

    println!("Deleted repository '{}/{}'", owner, repo.name);
    Ok(())
}

#[derive(Serialize)]
struct RepositoryOutput<'a> {
    #[serde(flatten)]
    repo: &'a Repository,
    contributors: usize,
}

pub fn run_repo_list(data_dir: String, owner: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let owner_id = resolve_owner(&store, &owner)?;
    let repos = store.list_repositories(owner_id)?;

    let mut output = Vec::with_capacity(repos.len());
    for repo in &repos {
        output.push(RepositoryOutput {
            repo,
            contributors: store.list_contributors(repo.id)?.len(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.is_empty() {
        println!("No repositories found.");
        return Ok(());
    }

    let kind = match owner_id {
        Owner::User(_) => "user",
        Owner::Organization(_) => "organization",
    };
    println!("Repositories of {kind} \"{owner}\":");
    for entry in output {
        println!(
            "  {:>4}  {}  {}  {} contributor(s)",
            entry.repo.id, entry.repo.name, entry.repo.visibility, entry.contributors
        );
    }
    Ok(())
}

pub fn run_repo_grant(
    data_dir: String,
    owner: String,
    name: String,
    username: String,
    role: Role,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let repo = require_repository(&store, &owner, &name)?;
    let user = require_user(&store, &username)?;

    let contributor = store.upsert_contributor(repo.id, user.id, role)?;
    println!(
        "Granted {} on \"{}/{}\" to \"{}\"",
        contributor.role, owner, repo.name, user.username
    );
    Ok(())
}

pub fn run_repo_revoke(
    data_dir: String,
    owner: String,
    name: String,
    username: String,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let repo = require_repository(&store, &owner, &name)?;
    let user = require_user(&store, &username)?;

    if !store.remove_contributor(repo.id, user.id)? {
        anyhow::bail!(
            "\"{}\" is not a contributor of \"{}/{}\"",
            user.username,
            owner,
            repo.name
        );
    }

    println!(
        "Revoked access to \"{}/{}\" from \"{}\"",
        owner, repo.name, user.username
    );
    Ok(())
}

pub fn run_repo_visibility(
    data_dir: String,
    owner: String,
    name: String,
    visibility: Visibility,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let repo = require_repository(&store, &owner, &name)?;

    store.update_repository_visibility(repo.id, visibility)?;
    println!("\"{}/{}\" is now {}", owner, repo.name, visibility);
    Ok(())
}
