use serde::Serialize;

use crate::error::Error;
use crate::server::validation::validate_username;
use crate::store::Store;
use crate::types::Organization;

use super::{init_store, require_user};

fn require_org(store: &dyn Store, name: &str) -> anyhow::Result<Organization> {
    store
        .get_organization_by_username(name)?
        .ok_or_else(|| anyhow::anyhow!("Organization '{}' not found", name))
}

pub fn run_org_create(
    data_dir: String,
    username: String,
    display_name: String,
    members: Vec<String>,
) -> anyhow::Result<()> {
    validate_username(&username).map_err(anyhow::Error::msg)?;
    let store = init_store(&data_dir)?;

    // Resolve members up front so a typo doesn't leave a half-created org
    let members = members
        .iter()
        .map(|name| require_user(&store, name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let org = match store.create_organization(&username, &display_name) {
        Ok(org) => org,
        Err(Error::AlreadyExists) => anyhow::bail!("Username '{}' is already taken", username),
        Err(e) => return Err(e.into()),
    };

    for member in &members {
        store.add_organization_member(org.id, member.id)?;
    }

    println!(
        "Created organization \"{}\" (id {}) with {} member(s)",
        org.username,
        org.id,
        members.len()
    );
    Ok(())
}

#[derive(Serialize)]
struct OrganizationOutput<'a> {
    #[serde(flatten)]
    org: &'a Organization,
    members: Vec<String>,
}

pub fn run_org_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let orgs = store.list_organizations()?;

    let mut output = Vec::with_capacity(orgs.len());
    for org in &orgs {
        let mut members = Vec::new();
        for member in store.list_organization_members(org.id)? {
            if let Some(user) = store.get_user(member.user_id)? {
                members.push(user.username);
            }
        }
        output.push(OrganizationOutput { org, members });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if output.is_empty() {
        println!("No organizations found.");
        return Ok(());
    }

    for entry in output {
        println!(
            "  {:>4}  {}  {}",
            entry.org.id,
            entry.org.username,
            entry.members.join(", ")
        );
    }
    Ok(())
}

pub fn run_org_add_member(data_dir: String, org: String, username: String) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let org = require_org(&store, &org)?;
    let user = require_user(&store, &username)?;

    store.add_organization_member(org.id, user.id)?;
    println!("Added \"{}\" to \"{}\"", user.username, org.username);
    Ok(())
}

pub fn run_org_remove_member(
    data_dir: String,
    org: String,
    username: String,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let org = require_org(&store, &org)?;
    let user = require_user(&store, &username)?;

    if !store.remove_organization_member(org.id, user.id)? {
        anyhow::bail!("\"{}\" is not a member of \"{}\"", user.username, org.username);
    }

    println!("Removed \"{}\" from \"{}\"", user.username, org.username);
    Ok(())
}
