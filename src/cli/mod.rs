mod commands;
mod org;
mod repo;
mod token;
mod user;

pub use commands::{OrgCommands, RepoCommands, TokenCommands, UserCommands};
pub use org::{run_org_add_member, run_org_create, run_org_list, run_org_remove_member};
pub use repo::{
    run_repo_create, run_repo_delete, run_repo_grant, run_repo_list, run_repo_revoke,
    run_repo_visibility,
};
pub use token::{run_token_create, run_token_list, run_token_revoke};
pub use user::{run_user_create, run_user_list, run_user_password};

use crate::store::{SqliteStore, Store};
use crate::types::{Owner, User};

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join("hypercommit.db");

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'hypercommit init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

fn require_user(store: &dyn Store, username: &str) -> anyhow::Result<User> {
    store
        .get_user_by_username(username)?
        .ok_or_else(|| anyhow::anyhow!("User '{}' not found", username))
}

/// Resolves a username to a user first, then an organization.
fn resolve_owner(store: &dyn Store, name: &str) -> anyhow::Result<Owner> {
    if let Some(user) = store.get_user_by_username(name)? {
        return Ok(Owner::User(user.id));
    }
    if let Some(org) = store.get_organization_by_username(name)? {
        return Ok(Owner::Organization(org.id));
    }
    anyhow::bail!("No user or organization named '{}'", name)
}

/// Reads a password from stdin or prompts for it with confirmation.
fn read_password(from_stdin: bool) -> anyhow::Result<String> {
    let password = if from_stdin {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        inquire::Password::new("Password:")
            .with_display_mode(inquire::PasswordDisplayMode::Masked)
            .prompt()?
    };

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}
