//! Receipts and spending commands.

use anyhow::Result;
use clap::{Args, ValueEnum};
use tally_store::{ReceiptBook, Route};
use tracing::debug;

use super::AppContext;
use crate::output::ReceiptsOutput;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the receipts command.
#[derive(Args)]
pub struct ReceiptsArgs {
    /// Case-insensitive filter on retailer, category or item names.
    #[arg(long, short)]
    pub search: Option<String>,

    /// Show at most this many receipts.
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

/// Breakdown dimension for the spending command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Breakdown {
    /// Per category.
    #[default]
    Category,
    /// Per store.
    Store,
}

/// Arguments for the spending command.
#[derive(Args)]
pub struct SpendingArgs {
    /// Group spending by category or store.
    #[arg(long, value_enum, default_value = "category")]
    pub by: Breakdown,
}

/// Runs the receipts command.
pub async fn run(args: &ReceiptsArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    if let Err(code) = ctx.require(Route::Data, cli).await {
        return Ok(code);
    }

    let book = ReceiptBook::load(&ctx.client).await?;
    let mut matches = book.search(args.search.as_deref().unwrap_or_default());
    if let Some(limit) = args.limit {
        matches.truncate(limit);
    }
    debug!(total = book.len(), shown = matches.len(), "Receipts loaded");

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&ReceiptsOutput::new(matches))?,
        OutputFormat::Text => {
            println!("{}", ctx.text.format_receipts(&matches));
            if !matches.is_empty() && !cli.quiet {
                let shown: f64 = matches.iter().map(|g| g.amount).sum();
                println!();
                println!(
                    "{} of {} receipts, ${shown:.2} of ${:.2}",
                    matches.len(),
                    book.len(),
                    book.total()
                );
            }
        }
    }

    Ok(ExitCode::Success)
}

/// Runs the spending command.
pub async fn spending(args: &SpendingArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    if let Err(code) = ctx.require(Route::Data, cli).await {
        return Ok(code);
    }

    let receipts = ctx.client.receipts();
    match args.by {
        Breakdown::Category => {
            let totals = receipts.by_category().await?;
            match ctx.format {
                OutputFormat::Json => ctx.print_json(&totals)?,
                OutputFormat::Text => println!("{}", ctx.text.format_categories(&totals)),
            }
        }
        Breakdown::Store => {
            let totals = receipts.by_store().await?;
            match ctx.format {
                OutputFormat::Json => ctx.print_json(&totals)?,
                OutputFormat::Text => println!("{}", ctx.text.format_stores(&totals)),
            }
        }
    }

    Ok(ExitCode::Success)
}
