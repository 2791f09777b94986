use clap::Subcommand;

use crate::types::{Role, Visibility};

#[derive(Subcommand)]
pub enum UserCommands {
    /// Create a user account
    Create {
        /// Data directory for database and repositories
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        username: String,

        #[arg(long, default_value = "")]
        display_name: String,

        /// Read the password from the first line of stdin
        #[arg(long, conflicts_with = "no_password")]
        password_stdin: bool,

        /// Create the account without a password (token-only access)
        #[arg(long)]
        no_password: bool,
    },

    /// List user accounts
    List {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set or clear a user's password
    Password {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        username: String,

        /// Read the password from the first line of stdin
        #[arg(long, conflicts_with = "clear")]
        password_stdin: bool,

        /// Remove the password; the user can then only authenticate with tokens
        #[arg(long)]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum OrgCommands {
    /// Create an organization
    Create {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        username: String,

        #[arg(long, default_value = "")]
        display_name: String,

        /// Initial members (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
    },

    /// List organizations
    List {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a user to an organization
    AddMember {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        org: String,
        username: String,
    },

    /// Remove a user from an organization
    RemoveMember {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        org: String,
        username: String,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// Create a repository and its bare Git directory
    Create {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Root directory for repositories (defaults to <data-dir>/repos)
        #[arg(long, env = "REPOS_BASE_PATH")]
        repos_path: Option<String>,

        /// Owning user or organization
        owner: String,

        name: String,

        #[arg(long, default_value = "private")]
        visibility: Visibility,

        #[arg(long, default_value = "main")]
        default_branch: String,

        #[arg(long)]
        description: Option<String>,

        /// User recorded as an admin contributor
        #[arg(long)]
        creator: Option<String>,
    },

    /// Delete a repository and its Git directory
    Delete {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Root directory for repositories (defaults to <data-dir>/repos)
        #[arg(long, env = "REPOS_BASE_PATH")]
        repos_path: Option<String>,

        owner: String,
        name: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// List repositories of an owner
    List {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        owner: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Grant a user a role on a repository
    Grant {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        owner: String,
        name: String,
        username: String,

        #[arg(long)]
        role: Role,
    },

    /// Remove a user's role on a repository
    Revoke {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        owner: String,
        name: String,
        username: String,
    },

    /// Change repository visibility
    Visibility {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        owner: String,
        name: String,
        visibility: Visibility,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue an access token for a user
    Create {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        username: String,

        /// Label shown in token listings
        #[arg(long)]
        name: String,
    },

    /// List a user's access tokens
    List {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        username: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Revoke an access token
    Revoke {
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        id: i64,
    },
}
