//! campus-cli - terminal client for the Campus Virtual platform
//!
//! Keeps a browser-like session (access token, refresh cookie, cached
//! profile) between invocations and refreshes it transparently.

mod api;
mod auth;
mod config;
mod session;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;

#[derive(Parser)]
#[command(name = "campus-cli")]
#[command(about = "Terminal client for Campus Virtual", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API base URL (overrides the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear the local session
    Logout,

    /// Show current session status
    Status,

    /// Send one request through the session client
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,

        /// Path relative to the API base URL, e.g. /cursos
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,

        /// Screen the request is made from
        #[arg(short, long, default_value = "/dashboard")]
        route: String,
    },

    /// Launch the terminal user interface
    Tui,
}

fn init_logging(verbose: bool, capture: Option<tui::LogBuffer>) {
    let filter = if verbose { "debug" } else { "info" };
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()));

    match capture {
        // Keep log output off the alternate screen
        Some(buffer) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(buffer),
            )
            .init(),
        None => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logs = tui::LogBuffer::new();
    let capture = matches!(cli.command, Commands::Tui).then(|| logs.clone());
    init_logging(cli.verbose, capture);

    let config = Config::load()?.with_api_url(cli.api_url)?;
    tracing::debug!("Using API at {}", config.api_url);

    match cli.command {
        Commands::Login { email, password } => {
            tracing::info!("Signing in...");
            auth::login(&config, &email, password).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout(&config).await?;
        }
        Commands::Status => {
            auth::status(&config).await?;
        }
        Commands::Request {
            method,
            path,
            data,
            route,
        } => {
            api::request(&config, &method, &path, data.as_deref(), &route).await?;
        }
        Commands::Tui => {
            tui::run(&config, logs).await?;
        }
    }

    Ok(())
}
