use crate::auth::PasswordHasher;
use crate::error::Error;
use crate::server::validation::validate_username;
use crate::store::Store;

use super::{init_store, read_password, require_user};

pub fn run_user_create(
    data_dir: String,
    username: String,
    display_name: String,
    password_stdin: bool,
    no_password: bool,
) -> anyhow::Result<()> {
    validate_username(&username).map_err(anyhow::Error::msg)?;
    let store = init_store(&data_dir)?;

    let password_hash = if no_password {
        None
    } else {
        let password = read_password(password_stdin)?;
        Some(PasswordHasher::new().hash(&password)?)
    };

    let user = match store.create_user(&username, &display_name, password_hash.as_deref()) {
        Ok(user) => user,
        Err(Error::AlreadyExists) => anyhow::bail!("Username '{}' is already taken", username),
        Err(e) => return Err(e.into()),
    };

    println!("Created user \"{}\" (id {})", user.username, user.id);
    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = store.list_users()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }

    for user in users {
        let password = if user.password_hash.is_some() {
            "password"
        } else {
            "token-only"
        };
        println!("  {:>4}  {}  {}", user.id, user.username, password);
    }
    Ok(())
}

pub fn run_user_password(
    data_dir: String,
    username: String,
    password_stdin: bool,
    clear: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let user = require_user(&store, &username)?;

    if clear {
        store.update_user_password(user.id, None)?;
        println!("Cleared password for \"{}\"", user.username);
        return Ok(());
    }

    let password = read_password(password_stdin)?;
    let hash = PasswordHasher::new().hash(&password)?;
    store.update_user_password(user.id, Some(&hash))?;

    println!("Updated password for \"{}\"", user.username);
    Ok(())
}
