use serde::Serialize;

use crate::auth::generate_access_token;
use crate::store::Store;
use crate::types::AccessToken;

use super::{init_store, require_user};

#[derive(Serialize)]
struct TokenOutput {
    id: i64,
    name: String,
    created_at: String,
    last_used_at: Option<String>,
}

impl From<&AccessToken> for TokenOutput {
    fn from(token: &AccessToken) -> Self {
        Self {
            id: token.id,
            name: token.name.clone(),
            created_at: token.created_at.to_rfc3339(),
            last_used_at: token.last_used_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

pub fn run_token_create(data_dir: String, username: String, name: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let user = require_user(&store, &username)?;

    let (raw_token, token_hash) = generate_access_token();
    let token = store.create_access_token(user.id, &name, &token_hash)?;

    println!();
    println!(
        "Token {} created for '{}': {}",
        token.id, user.username, raw_token
    );
    println!("  Save this now - it cannot be retrieved later.");
    println!();

    Ok(())
}

pub fn run_token_list(data_dir: String, username: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let user = require_user(&store, &username)?;
    let tokens = store.list_user_access_tokens(user.id)?;

    if json {
        let output: Vec<TokenOutput> = tokens.iter().map(TokenOutput::from).collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if tokens.is_empty() {
        println!("No tokens found.");
        return Ok(());
    }

    for token in &tokens {
        let last_used = token
            .last_used_at
            .map(|dt| format!("last used {}", dt.format("%Y-%m-%d %H:%M")))
            .unwrap_or_else(|| "never used".to_string());
        println!(
            "  {:>4}  {}  created {}  {}",
            token.id,
            token.name,
            token.created_at.format("%Y-%m-%d"),
            last_used
        );
    }
    Ok(())
}

pub fn run_token_revoke(data_dir: String, id: i64) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let token = store
        .get_access_token(id)?
        .ok_or_else(|| anyhow::anyhow!("Token {} not found", id))?;

    store.delete_access_token(token.id)?;
    println!("Token {} (\"{}\") revoked.", token.id, token.name);
    Ok(())
}
