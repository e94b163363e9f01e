//! Upload command - OCR receipt images and save their items.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use futures::future::join_all;
use tally_store::{Route, SourceFile, UploadPipeline};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use super::AppContext;
use crate::output::{TextFormatter, UploadOutput};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the upload command.
#[derive(Args)]
pub struct UploadArgs {
    /// Receipt images to upload.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Runs the upload command.
pub async fn run(args: &UploadArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    if let Err(code) = ctx.require(Route::Upload, cli).await {
        return Ok(code);
    }

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = SourceFile::open(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(file);
    }
    info!(count = files.len(), "Uploading receipts");

    let pipeline = UploadPipeline::new(ctx.client.clone());

    // Progress lines follow the event stream; the task ends once the
    // pipeline (and with it the sender) is dropped.
    let printer = (ctx.format == OutputFormat::Text && !cli.quiet).then(|| {
        let mut events = pipeline.subscribe();
        let text = TextFormatter::new(!cli.no_color);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => println!("{}", text.format_upload_event(&event)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Upload progress fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    let outcomes = join_all(files.into_iter().map(|file| pipeline.submit(file))).await;
    let extracted = pipeline.extracted().await;
    drop(pipeline);

    if let Some(printer) = printer {
        printer.await.context("Progress printer failed")?;
    }

    match ctx.format {
        OutputFormat::Json => {
            let output: Vec<UploadOutput<'_>> = outcomes.iter().map(UploadOutput::from).collect();
            ctx.print_json(&output)?;
        }
        OutputFormat::Text => {
            println!();
            for outcome in &outcomes {
                println!("{}", ctx.text.format_outcome(outcome));
            }
            if let Some(receipt) = &extracted {
                println!();
                println!("{}", ctx.text.format_extracted(receipt));
            }
        }
    }

    Ok(if outcomes.iter().all(|o| o.is_success()) {
        ExitCode::Success
    } else {
        ExitCode::UploadFailed
    })
}
