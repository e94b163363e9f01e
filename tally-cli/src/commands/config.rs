//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use tally_store::{Settings, SettingsStore, default_config_dir};
use tracing::info;

use crate::output::{JsonFormatter, SettingsOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set one setting.
    Set {
        /// Setting name.
        key: String,
        /// New value (empty clears `session_cookie`).
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command against the loaded settings file.
pub async fn run(args: &ConfigArgs, cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli, store).await?,
        ConfigAction::Path => show_paths(cli, store)?,
        ConfigAction::Set { key, value } => set_value(key, value, cli, store).await?,
        ConfigAction::Reset => reset_config(cli, store).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("Tally Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("{}", TextFormatter::new(!cli.no_color).format_settings(&settings));
        }
        OutputFormat::Json => {
            let output = SettingsOutput::new(&settings, store.path().display().to_string());
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", store.path().display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "configDir": config_dir.display().to_string(),
                "settingsFile": store.path().display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }

    Ok(())
}

async fn set_value(key: &str, value: &str, cli: &Cli, store: &SettingsStore) -> Result<()> {
    store.update(|settings| settings.set(key, value)).await?;
    store.save().await?;

    info!(key, "Setting updated");
    if !cli.quiet {
        println!("Set {key}");
    }

    Ok(())
}

async fn reset_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    store.update(|settings| *settings = Settings::default()).await;
    store.save().await?;

    info!(path = %store.path().display(), "Settings reset");
    if !cli.quiet {
        println!("Configuration reset to defaults");
    }

    Ok(())
}
