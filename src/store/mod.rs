mod disk;
pub mod path;
mod schema;
mod sqlite;

pub use disk::{init_bare_repository, remove_repository_dir};
pub use path::{absolute_repository_path, repository_path};
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(
        &self,
        username: &str,
        display_name: &str,
        password_hash: Option<&str>,
    ) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user_password(&self, id: i64, password_hash: Option<&str>) -> Result<()>;

    // Organization operations
    fn create_organization(&self, username: &str, display_name: &str) -> Result<Organization>;
    fn get_organization_by_username(&self, username: &str) -> Result<Option<Organization>>;
    fn list_organizations(&self) -> Result<Vec<Organization>>;

    // Organization membership
    fn add_organization_member(&self, organization_id: i64, user_id: i64) -> Result<()>;
    fn remove_organization_member(&self, organization_id: i64, user_id: i64) -> Result<bool>;
    fn is_organization_member(&self, organization_id: i64, user_id: i64) -> Result<bool>;
    fn list_organization_members(&self, organization_id: i64) -> Result<Vec<OrganizationMember>>;

    // Repository operations
    fn create_repository(&self, repo: &NewRepository) -> Result<Repository>;
    fn find_repository(&self, owner: Owner, name: &str) -> Result<Option<Repository>>;
    fn list_repositories(&self, owner: Owner) -> Result<Vec<Repository>>;
    fn update_repository_visibility(&self, id: i64, visibility: Visibility) -> Result<()>;
    fn delete_repository(&self, id: i64) -> Result<bool>;

    // Contributor operations (at most one row per repository/user pair)
    fn upsert_contributor(&self, repository_id: i64, user_id: i64, role: Role)
    -> Result<Contributor>;
    fn find_contributor(&self, repository_id: i64, user_id: i64) -> Result<Option<Contributor>>;
    fn list_contributors(&self, repository_id: i64) -> Result<Vec<Contributor>>;
    fn remove_contributor(&self, repository_id: i64, user_id: i64) -> Result<bool>;

    // Access token operations
    fn create_access_token(&self, user_id: i64, name: &str, token_hash: &str)
    -> Result<AccessToken>;
    fn get_access_token(&self, id: i64) -> Result<Option<AccessToken>>;
    fn find_access_token_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>>;
    fn list_user_access_tokens(&self, user_id: i64) -> Result<Vec<AccessToken>>;
    fn delete_access_token(&self, id: i64) -> Result<bool>;
    fn update_access_token_last_used(&self, id: i64) -> Result<()>;
}
