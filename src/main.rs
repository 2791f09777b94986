use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hypercommit::cli::{
    OrgCommands, RepoCommands, TokenCommands, UserCommands, run_org_add_member, run_org_create,
    run_org_list, run_org_remove_member, run_repo_create, run_repo_delete, run_repo_grant,
    run_repo_list, run_repo_revoke, run_repo_visibility, run_token_create, run_token_list,
    run_token_revoke, run_user_create, run_user_list, run_user_password,
};
use hypercommit::config::{DEFAULT_CGI_TIMEOUT, ServerConfig, resolve_signing_secret};
use hypercommit::server::{AppState, create_router};
use hypercommit::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "hypercommit")]
#[command(about = "A self-hosted Git forge", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and repository directory
    Init {
        /// Data directory for database and repositories
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, env = "HTTP_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, env = "HTTP_PORT", default_value = "3000")]
        port: u16,

        /// Data directory for database and repositories
        #[arg(long, env = "DATA_DIR", default_value = "./data")]
        data_dir: String,

        /// Root directory for repositories (defaults to <data-dir>/repos)
        #[arg(long, env = "REPOS_BASE_PATH")]
        repos_path: Option<String>,

        /// Key for signing session cookies.
        /// $CREDENTIALS_DIRECTORY/signing_secret takes precedence when present.
        #[arg(long, env = "SIGNING_SECRET", hide_env_values = true)]
        signing_secret: Option<String>,

        /// Git executable used to run http-backend
        #[arg(long, env = "GIT_BINARY", default_value = "git")]
        git_binary: String,

        /// Seconds before a git http-backend invocation is killed
        #[arg(long, default_value_t = DEFAULT_CGI_TIMEOUT.as_secs())]
        cgi_timeout: u64,

        /// Propagate the backend's CGI Status code instead of always answering 200
        #[arg(long)]
        forward_cgi_status: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage organizations
    Org {
        #[command(subcommand)]
        command: OrgCommands,
    },

    /// Manage repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Manage access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

fn run_init(data_dir: String) -> anyhow::Result<()> {
    let data_path = PathBuf::from(data_dir);
    fs::create_dir_all(data_path.join("repos"))?;

    let db_path = data_path.join("hypercommit.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hypercommit=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => run_init(data_dir)?,
        Commands::Serve {
            host,
            port,
            data_dir,
            repos_path,
            signing_secret,
            git_binary,
            cgi_timeout,
            forward_cgi_status,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                repos_base_path: repos_path.map(PathBuf::from),
                signing_secret: resolve_signing_secret(signing_secret)?,
                git_binary,
                cgi_timeout: Duration::from_secs(cgi_timeout),
                forward_cgi_status,
            };

            fs::create_dir_all(config.repos_path())?;

            let store = SqliteStore::new(config.db_path())?;
            store.initialize()?;

            let state = Arc::new(AppState::from_config(Arc::new(store), &config));
            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!(
                "Serving repositories from {}",
                config.repos_path().display()
            );
            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
        Commands::User { command } => match command {
            UserCommands::Create {
                data_dir,
                username,
                display_name,
                password_stdin,
                no_password,
            } => run_user_create(data_dir, username, display_name, password_stdin, no_password)?,
            UserCommands::List { data_dir, json } => run_user_list(data_dir, json)?,
            UserCommands::Password {
                data_dir,
                username,
                password_stdin,
                clear,
            } => run_user_password(data_dir, username, password_stdin, clear)?,
        },
        Commands::Org { command } => match command {
            OrgCommands::Create {
                data_dir,
                username,
                display_name,
                members,
            } => run_org_create(data_dir, username, display_name, members)?,
            OrgCommands::List { data_dir, json } => run_org_list(data_dir, json)?,
            OrgCommands::AddMember {
                data_dir,
                org,
                username,
            } => run_org_add_member(data_dir, org, username)?,
            OrgCommands::RemoveMember {
                data_dir,
                org,
                username,
            } => run_org_remove_member(data_dir, org, username)?,
        },
        Commands::Repo { command } => match command {
            RepoCommands::Create {
                data_dir,
                repos_path,
                owner,
                name,
                visibility,
                default_branch,
                description,
                creator,
            } => run_repo_create(
                data_dir,
                repos_path,
                owner,
                name,
                visibility,
                default_branch,
                description,
                creator,
            )?,
            RepoCommands::Delete {
                data_dir,
                repos_path,
                owner,
                name,
                yes,
            } => run_repo_delete(data_dir, repos_path, owner, name, yes)?,
            RepoCommands::List {
                data_dir,
                owner,
                json,
            } => run_repo_list(data_dir, owner, json)?,
            RepoCommands::Grant {
                data_dir,
                owner,
                name,
                username,
                role,
            } => run_repo_grant(data_dir, owner, name, username, role)?,
            RepoCommands::Revoke {
                data_dir,
                owner,
                name,
                username,
            } => run_repo_revoke(data_dir, owner, name, username)?,
            RepoCommands::Visibility {
                data_dir,
                owner,
                name,
                visibility,
            } => run_repo_visibility(data_dir, owner, name, visibility)?,
        },
        Commands::Token { command } => match command {
            TokenCommands::Create {
                data_dir,
                username,
                name,
            } => run_token_create(data_dir, username, name)?,
            TokenCommands::List {
                data_dir,
                username,
                json,
            } => run_token_list(data_dir, username, json)?,
            TokenCommands::Revoke { data_dir, id } => run_token_revoke(data_dir, id)?,
        },
    }

    Ok(())
}
