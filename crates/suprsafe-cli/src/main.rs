//! SuprSafe - password-gated AES-256 directory encryption CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// SuprSafe - encrypt a directory behind an account password and a main key
#[derive(Parser)]
#[command(name = "suprsafe")]
#[command(about = "Password-gated AES-256 directory encryption")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to account record and settings storage
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up the account password (first run)
    Init,

    /// Encrypt every file in a directory
    Encrypt {
        /// Directory to protect
        #[arg(long)]
        dir: PathBuf,
    },

    /// Decrypt a previously encrypted directory
    Decrypt {
        /// Directory to restore
        #[arg(long)]
        dir: PathBuf,
    },

    /// Show account, SuprSafe+ and directory status
    Status {
        /// Directory to inspect
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Configure SuprSafe+ destructive lockout
    Plus {
        #[command(subcommand)]
        action: PlusAction,
    },
}

#[derive(Subcommand)]
enum PlusAction {
    /// Turn on the failed-attempt wipe (sets up the admin password)
    Enable,
    /// Turn off the failed-attempt wipe (requires the admin password)
    Disable,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "suprsafe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let data_dir = cli
        .data_dir
        .unwrap_or_else(suprsafe_core::config::default_data_dir);

    match cli.command {
        Commands::Init => commands::init(&data_dir),
        Commands::Encrypt { dir } => commands::encrypt(&data_dir, &dir),
        Commands::Decrypt { dir } => commands::decrypt(&data_dir, &dir),
        Commands::Status { dir } => commands::status(&data_dir, dir.as_deref()),
        Commands::Plus { action } => match action {
            PlusAction::Enable => commands::plus_enable(&data_dir),
            PlusAction::Disable => commands::plus_disable(&data_dir),
        },
    }
}
