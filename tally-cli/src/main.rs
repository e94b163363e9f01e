// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Tally CLI - receipt management from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Sign in and check who you are
//! tally login ada
//! tally whoami
//!
//! # Upload receipts for OCR
//! tally upload ~/Downloads/receipt.jpg
//!
//! # Browse and search stored receipts
//! tally receipts --search coffee
//!
//! # Dashboard figures, JSON for scripting
//! tally dashboard --format json --pretty
//!
//! # Ask the assistant
//! tally chat "How much did I spend on groceries this month?"
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tally_store::{LogLevel, SettingsStore};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{auth, chat, config, dashboard, receipts, upload};

// ============================================================================
// CLI Definition
// ============================================================================

/// Tally CLI - receipt management.
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Receipt management CLI")]
#[command(long_about = r#"
Tally uploads receipt images for OCR, stores the extracted line items and
lets you browse, search and ask questions about your spending.

Examples:
  tally login ada                 # Password sign-in
  tally upload receipt.jpg        # OCR and save items
  tally receipts --search milk    # Search stored receipts
  tally dashboard                 # Headline figures
  tally chat "top store?"         # Ask the assistant
"#)]
#[command(version)]
#[command(author = "Tally Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Backend URL (overrides settings and `TALLY_BASE_URL`).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with a username and password.
    Login(auth::LoginArgs),

    /// Create an account and sign in.
    Register(auth::RegisterArgs),

    /// Sign in with an identity produced by the identity wallet.
    WalletLogin(auth::WalletLoginArgs),

    /// Sign out.
    Logout,

    /// Show the signed-in identity.
    Whoami,

    /// Upload receipt images for OCR and save their items.
    #[command(visible_alias = "u")]
    Upload(upload::UploadArgs),

    /// List and search stored receipts.
    #[command(visible_alias = "r")]
    Receipts(receipts::ReceiptsArgs),

    /// Spending per category or store.
    Spending(receipts::SpendingArgs),

    /// Show dashboard figures.
    #[command(visible_alias = "d")]
    Dashboard,

    /// Ask the AI assistant about your spending.
    Chat(chat::ChatArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Not signed in.
    NotAuthenticated = 2,
    /// At least one upload failed.
    UploadFailed = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("tally=debug,info")
    } else {
        // Prefix match: also covers tally_fetch, tally_store and tally_cli.
        EnvFilter::new(format!("tally={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = SettingsStore::load_default().await?;
    setup_logging(cli.verbose, cli.quiet, settings.get().await.log_level);

    let result = match &cli.command {
        Commands::Login(args) => auth::login(args, &cli).await,
        Commands::Register(args) => auth::register(args, &cli).await,
        Commands::WalletLogin(args) => auth::wallet_login(args, &cli).await,
        Commands::Logout => auth::logout(&cli).await,
        Commands::Whoami => auth::whoami(&cli).await,
        Commands::Upload(args) => upload::run(args, &cli).await,
        Commands::Receipts(args) => receipts::run(args, &cli).await,
        Commands::Spending(args) => receipts::spending(args, &cli).await,
        Commands::Dashboard => dashboard::run(&cli).await,
        Commands::Chat(args) => chat::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli, &settings).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
