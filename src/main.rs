use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod app;
mod auth;
mod config;
mod dates;
mod error;
mod forms;
mod grouping;
mod models;
mod ownership;
mod routes;
mod storage;
mod ui;
mod views;

use app::AppState;
use auth::LocalUsers;
use config::{IdentityProviderKind, Settings};
use storage::Store;

/// Multi-user time tracking web app
#[derive(Parser, Debug)]
#[command(name = "timetracker", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "TIMETRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter (trace, debug, info, warn, error or a full EnvFilter directive)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,

        /// Data file holding users, clients, projects and entries
        #[arg(long)]
        data: Option<PathBuf>,
    },

    /// Register a user who can log in
    AddUser {
        username: String,

        #[arg(long, env = "TIMETRACKER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Data file holding users, clients, projects and entries
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load(cli.config.clone()).context("Failed to read config file")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Serve { bind, data } => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            if data.is_some() {
                settings.data_path = data;
            }
            serve(settings).await
        }
        Commands::AddUser {
            username,
            password,
            data,
        } => {
            if data.is_some() {
                settings.data_path = data;
            }
            add_user(&settings, username.trim(), &password)
        }
    }
}

fn open_store(settings: &Settings) -> Result<Arc<Store>> {
    let path = settings
        .resolved_data_path()
        .context("No data path configured and home directory not found")?;
    let store = Store::open(&path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn serve(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let bind = settings.bind.clone();
    let state = AppState::new(store.clone(), settings);
    let router = routes::build_router(state);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    tracing::info!(
        address = %bind,
        data = ?store.path(),
        "timetracker listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("timetracker stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn add_user(settings: &Settings, username: &str, password: &str) -> Result<()> {
    ensure!(!username.is_empty(), "Username must not be empty");
    ensure!(!password.is_empty(), "Password must not be empty");

    let store = open_store(settings)?;
    let identity = match settings.identity {
        IdentityProviderKind::Local => LocalUsers::new(store).register(username, password)?,
    };
    println!("Created user {} (id {})", identity.username, identity.id);
    Ok(())
}
