//! Chat command - ask the assistant about spending.

use anyhow::Result;
use clap::Args;
use tally_fetch::ApiError;
use tally_store::Route;
use tracing::warn;

use super::AppContext;
use crate::output::ChatOutput;
use crate::{Cli, ExitCode, OutputFormat};

const FALLBACK_REPLY: &str = "Sorry, I encountered an error processing your question.";

/// Arguments for the chat command.
#[derive(Args)]
pub struct ChatArgs {
    /// The question.
    #[arg(required = true, trailing_var_arg = true)]
    pub question: Vec<String>,
}

/// Runs the chat command.
pub async fn run(args: &ChatArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    if let Err(code) = ctx.require(Route::Assistant, cli).await {
        return Ok(code);
    }

    let query = args.question.join(" ");
    let result = ctx.client.chat().query(&query).await;

    let (response, error) = match &result {
        Ok(reply) => (Some(reply.response.as_str()), None),
        Err(ApiError::InvalidInput(message)) => (None, Some(message.as_str())),
        Err(e) => {
            warn!(error = %e, status = ?e.status(), "Chat query failed");
            (None, Some(e.server_message().unwrap_or(FALLBACK_REPLY)))
        }
    };

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&ChatOutput {
            query: &query,
            response,
            error,
        })?,
        OutputFormat::Text => match (response, error) {
            (Some(response), _) => println!("{response}"),
            (None, Some(error)) => eprintln!("{}", ctx.text.format_failure(error)),
            (None, None) => {}
        },
    }

    Ok(if result.is_ok() {
        ExitCode::Success
    } else {
        ExitCode::Error
    })
}
