//! Dashboard command.

use anyhow::Result;
use tally_store::{Dashboard, Route};

use super::AppContext;
use crate::output::DashboardOutput;
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the dashboard command.
pub async fn run(cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    if let Err(code) = ctx.require(Route::Dashboard, cli).await {
        return Ok(code);
    }

    let dashboard = Dashboard::load(&ctx.client).await?;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&DashboardOutput {
            cards: dashboard.cards(),
            dashboard: &dashboard,
        })?,
        OutputFormat::Text => println!("{}", ctx.text.format_dashboard(&dashboard)),
    }

    Ok(ExitCode::Success)
}
