//! CLI command implementations.

pub mod auth;
pub mod chat;
pub mod config;
pub mod dashboard;
pub mod receipts;
pub mod upload;

use anyhow::{Context, Result};
use tally_fetch::ApiClient;
use tally_store::{Access, Route, SessionManager, Settings, SettingsStore, default_config_dir};
use tracing::debug;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Settings, client and formatters shared by every command.
pub struct AppContext {
    pub settings: Settings,
    pub client: ApiClient,
    pub text: TextFormatter,
    pub json: JsonFormatter,
    pub format: OutputFormat,
}

impl AppContext {
    /// Loads settings (file, then environment, then flags) and connects.
    pub async fn load(cli: &Cli) -> Result<Self> {
        let mut settings = SettingsStore::load_default().await?.get().await;
        settings.apply_env();
        if let Some(url) = &cli.base_url {
            settings.base_url.clone_from(url);
        }

        let client = settings
            .connect(&default_config_dir())
            .await
            .context("Failed to set up the backend client")?;
        debug!(base_url = %client.base_url(), "Client ready");

        Ok(Self {
            settings,
            client,
            text: TextFormatter::new(!cli.no_color),
            json: JsonFormatter::new(cli.pretty),
            format: cli.format,
        })
    }

    /// A session manager over this context's client.
    pub fn session(&self) -> SessionManager {
        SessionManager::new(self.client.clone())
    }

    /// Verifies the session and applies the route guard.
    ///
    /// Returns the manager when the route may render; otherwise prints a hint
    /// and returns [`ExitCode::NotAuthenticated`].
    pub async fn require(&self, route: Route, cli: &Cli) -> Result<SessionManager, ExitCode> {
        let session = self.session();
        session.initialize().await;

        match session.guard(route) {
            Access::Allow => Ok(session),
            Access::Pending | Access::RedirectToLogin => {
                if !cli.quiet {
                    eprintln!("Not signed in. Run `tally login` or `tally wallet-login` first.");
                }
                Err(ExitCode::NotAuthenticated)
            }
        }
    }

    /// Prints a serializable value as JSON.
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", self.json.format(value)?);
        Ok(())
    }
}
