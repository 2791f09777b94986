use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str = "id, username, display_name, password_hash, created_at, updated_at";
const ORGANIZATION_COLUMNS: &str = "id, username, display_name, created_at, updated_at";
const REPOSITORY_COLUMNS: &str = "id, name, description, default_branch, visibility, owner_user_id, owner_org_id, created_at, updated_at";
const CONTRIBUTOR_COLUMNS: &str = "id, repository_id, user_id, role, created_at";
const ACCESS_TOKEN_COLUMNS: &str = "id, user_id, name, token_hash, last_used_at, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn insert_error(err: rusqlite::Error) -> Error {
    if is_unique_violation(&err) {
        Error::AlreadyExists
    } else {
        Error::from(err)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn repository_from_row(row: &Row<'_>) -> rusqlite::Result<Repository> {
    let visibility: String = row.get(4)?;
    let visibility = visibility
        .parse::<Visibility>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let owner = match (row.get::<_, Option<i64>>(5)?, row.get::<_, Option<i64>>(6)?) {
        (Some(user_id), None) => Owner::User(user_id),
        (None, Some(org_id)) => Owner::Organization(org_id),
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Null,
                "repository must have exactly one owner".into(),
            ));
        }
    };

    Ok(Repository {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        default_branch: row.get(3)?,
        visibility,
        owner,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn contributor_from_row(row: &Row<'_>) -> rusqlite::Result<Contributor> {
    let role: String = row.get(3)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(Contributor {
        id: row.get(0)?,
        repository_id: row.get(1)?,
        user_id: row.get(2)?,
        role,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn access_token_from_row(row: &Row<'_>) -> rusqlite::Result<AccessToken> {
    Ok(AccessToken {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        token_hash: row.get(3)?,
        last_used_at: row.get::<_, Option<String>>(4)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn username_taken(conn: &Connection, table: &str, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE username = ?1"),
        params![username],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(
        &self,
        username: &str,
        display_name: &str,
        password_hash: Option<&str>,
    ) -> Result<User> {
        let conn = self.conn();
        if username_taken(&conn, "organizations", username)? {
            return Err(Error::AlreadyExists);
        }

        let now = format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO users (username, display_name, password_hash, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![username, display_name, password_hash, now],
        )
        .map_err(insert_error)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .map_err(Error::from)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username ASC"
        ))?;

        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user_password(&self, id: i64, password_hash: Option<&str>) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Organization operations

    fn create_organization(&self, username: &str, display_name: &str) -> Result<Organization> {
        let conn = self.conn();
        if username_taken(&conn, "users", username)? {
            return Err(Error::AlreadyExists);
        }

        let now = format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO organizations (username, display_name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![username, display_name, now],
        )
        .map_err(insert_error)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = ?1"),
            params![id],
            organization_from_row,
        )
        .map_err(Error::from)
    }

    fn get_organization_by_username(&self, username: &str) -> Result<Option<Organization>> {
        self.conn()
            .query_row(
                &format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE username = ?1"),
                params![username],
                organization_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_organizations(&self) -> Result<Vec<Organization>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations ORDER BY username ASC"
        ))?;

        let rows = stmt.query_map([], organization_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Organization membership

    fn add_organization_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        self.conn().execute(
            "INSERT INTO organization_members (organization_id, user_id, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(organization_id, user_id) DO NOTHING",
            params![organization_id, user_id, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn remove_organization_member(&self, organization_id: i64, user_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
            params![organization_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn is_organization_member(&self, organization_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
            params![organization_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_organization_members(&self, organization_id: i64) -> Result<Vec<OrganizationMember>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT organization_id, user_id, created_at
             FROM organization_members WHERE organization_id = ?1 ORDER BY created_at ASC",
        )?;

        let rows = stmt.query_map(params![organization_id], |row| {
            Ok(OrganizationMember {
                organization_id: row.get(0)?,
                user_id: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Repository operations

    fn create_repository(&self, repo: &NewRepository) -> Result<Repository> {
        let conn = self.conn();
        let now = format_datetime(&Utc::now());
        conn.execute(
            "INSERT INTO repositories
                (name, description, default_branch, visibility, owner_user_id, owner_org_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                repo.name,
                repo.description,
                repo.default_branch,
                repo.visibility.as_str(),
                repo.owner.user_id(),
                repo.owner.organization_id(),
                now,
            ],
        )
        .map_err(insert_error)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
            params![id],
            repository_from_row,
        )
        .map_err(Error::from)
    }

    fn find_repository(&self, owner: Owner, name: &str) -> Result<Option<Repository>> {
        let owner_column = match owner {
            Owner::User(_) => "owner_user_id",
            Owner::Organization(_) => "owner_org_id",
        };

        self.conn()
            .query_row(
                &format!(
                    "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE {owner_column} = ?1 AND name = ?2"
                ),
                params![owner.id(), name],
                repository_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_repositories(&self, owner: Owner) -> Result<Vec<Repository>> {
        let owner_column = match owner {
            Owner::User(_) => "owner_user_id",
            Owner::Organization(_) => "owner_org_id",
        };

        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE {owner_column} = ?1 ORDER BY name ASC"
        ))?;

        let rows = stmt.query_map(params![owner.id()], repository_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_repository_visibility(&self, id: i64, visibility: Visibility) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE repositories SET visibility = ?1, updated_at = ?2 WHERE id = ?3",
            params![visibility.as_str(), format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_repository(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM repositories WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Contributor operations

    fn upsert_contributor(
        &self,
        repository_id: i64,
        user_id: i64,
        role: Role,
    ) -> Result<Contributor> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO contributors (repository_id, user_id, role, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(repository_id, user_id) DO UPDATE SET role = excluded.role",
            params![
                repository_id,
                user_id,
                role.as_str(),
                format_datetime(&Utc::now())
            ],
        )?;

        conn.query_row(
            &format!(
                "SELECT {CONTRIBUTOR_COLUMNS} FROM contributors WHERE repository_id = ?1 AND user_id = ?2"
            ),
            params![repository_id, user_id],
            contributor_from_row,
        )
        .map_err(Error::from)
    }

    fn find_contributor(&self, repository_id: i64, user_id: i64) -> Result<Option<Contributor>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {CONTRIBUTOR_COLUMNS} FROM contributors WHERE repository_id = ?1 AND user_id = ?2"
                ),
                params![repository_id, user_id],
                contributor_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_contributors(&self, repository_id: i64) -> Result<Vec<Contributor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CONTRIBUTOR_COLUMNS} FROM contributors WHERE repository_id = ?1 ORDER BY created_at ASC"
        ))?;

        let rows = stmt.query_map(params![repository_id], contributor_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn remove_contributor(&self, repository_id: i64, user_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM contributors WHERE repository_id = ?1 AND user_id = ?2",
            params![repository_id, user_id],
        )?;
        Ok(rows > 0)
    }

    // Access token operations

    fn create_access_token(
        &self,
        user_id: i64,
        name: &str,
        token_hash: &str,
    ) -> Result<AccessToken> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO access_tokens (user_id, name, token_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, name, token_hash, format_datetime(&Utc::now())],
        )
        .map_err(insert_error)?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {ACCESS_TOKEN_COLUMNS} FROM access_tokens WHERE id = ?1"),
            params![id],
            access_token_from_row,
        )
        .map_err(Error::from)
    }

    fn get_access_token(&self, id: i64) -> Result<Option<AccessToken>> {
        self.conn()
            .query_row(
                &format!("SELECT {ACCESS_TOKEN_COLUMNS} FROM access_tokens WHERE id = ?1"),
                params![id],
                access_token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_access_token_by_hash(&self, token_hash: &str) -> Result<Option<AccessToken>> {
        self.conn()
            .query_row(
                &format!("SELECT {ACCESS_TOKEN_COLUMNS} FROM access_tokens WHERE token_hash = ?1"),
                params![token_hash],
                access_token_from_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_user_access_tokens(&self, user_id: i64) -> Result<Vec<AccessToken>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACCESS_TOKEN_COLUMNS} FROM access_tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], access_token_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_access_token(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM access_tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_access_token_last_used(&self, id: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE access_tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }
}
