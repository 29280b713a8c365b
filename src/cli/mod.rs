use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod auth;
pub mod init;
pub mod job;
pub mod serve;
pub mod sync;
pub mod watch;

use job::JobId;

#[derive(Subcommand)]
enum Command {
    /// Create the storage directory and db schema
    Init {},
    /// Run the API server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, env = "CALSYNC_PORT", default_value = "8080")]
        port: String,
    },
    /// Authorize access to Google Calendar and enable sync
    Auth {},
    /// Copy all past events of the authorized calendar into the backend
    Sync {},
    /// Register a push notification channel for the authorized calendar
    Watch {},
    /// Run a periodic job once
    Job {
        #[arg(long, value_enum)]
        id: JobId,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

/// Logging for one-shot commands, the server sets up its own
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let Some(command) = args.command else {
        return Ok(());
    };
    if !matches!(command, Command::Serve { .. }) {
        init_tracing();
    }
    let config = AppConfig::from_env()?;

    // Handle each sub command
    match command {
        Command::Init {} => init::run(&config).await?,
        Command::Serve { host, port } => serve::run(host, port, config).await?,
        Command::Auth {} => auth::run(&config).await?,
        Command::Sync {} => sync::run(&config).await?,
        Command::Watch {} => watch::run(&config).await?,
        Command::Job { id } => job::run(id, &config).await?,
    }

    Ok(())
}
