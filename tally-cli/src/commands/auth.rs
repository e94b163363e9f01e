//! Session commands: login, register, wallet-login, logout, whoami.

use std::io::{BufRead, Write};

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tally_core::{AuthMethod, Identity};
use tally_fetch::Registration;
use tally_store::{AuthFailure, SessionState};

use super::AppContext;
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Username.
    pub username: String,

    /// Password (read from stdin when omitted).
    #[arg(long)]
    pub password: Option<String>,
}

/// Arguments for the register command.
#[derive(Args)]
pub struct RegisterArgs {
    /// Username.
    pub username: String,

    /// Email address.
    #[arg(long)]
    pub email: String,

    /// Full name.
    #[arg(long)]
    pub full_name: Option<String>,

    /// Password (read from stdin when omitted).
    #[arg(long)]
    pub password: Option<String>,

    /// Password confirmation (read from stdin when omitted).
    #[arg(long)]
    pub confirm_password: Option<String>,
}

/// Sign-in method reported by the wallet widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WalletMethod {
    /// Email one-time code.
    Email,
    /// Federated Google sign-in.
    Google,
    /// Wallet signature.
    Wallet,
}

impl From<WalletMethod> for AuthMethod {
    fn from(method: WalletMethod) -> Self {
        match method {
            WalletMethod::Email => AuthMethod::Email,
            WalletMethod::Google => AuthMethod::Google,
            WalletMethod::Wallet => AuthMethod::Wallet,
        }
    }
}

/// Arguments for the wallet-login command.
#[derive(Args)]
pub struct WalletLoginArgs {
    /// Identity id issued by the wallet.
    #[arg(long)]
    pub id: String,

    /// Display name.
    #[arg(long)]
    pub name: String,

    /// Email address.
    #[arg(long)]
    pub email: Option<String>,

    /// How the wallet authenticated the user.
    #[arg(long, value_enum, default_value = "wallet")]
    pub method: WalletMethod,

    /// Wallet address.
    #[arg(long)]
    pub address: Option<String>,

    /// Wallet session token.
    #[arg(long)]
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionOutput<'a> {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<&'a Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a serde_json::Value>,
}

// ============================================================================
// Commands
// ============================================================================

/// Runs the login command.
pub async fn login(args: &LoginArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt("Password")?,
    };

    let result = ctx
        .session()
        .login_with_password(&args.username, &password)
        .await;
    report(&ctx, result, cli)
}

/// Runs the register command.
pub async fn register(args: &RegisterArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    let password = match &args.password {
        Some(p) => p.clone(),
        None => prompt("Password")?,
    };
    let confirm = match &args.confirm_password {
        Some(p) => p.clone(),
        None => prompt("Confirm password")?,
    };
    if password != confirm {
        bail!("Passwords do not match");
    }

    let mut registration = Registration::new(&args.username, &args.email, password);
    if let Some(name) = &args.full_name {
        registration = registration.with_full_name(name);
    }

    let result = ctx.session().register(&registration).await;
    report(&ctx, result, cli)
}

/// Runs the wallet-login command.
pub async fn wallet_login(args: &WalletLoginArgs, cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;

    let mut identity = Identity::new(&args.id, &args.name, args.method.into());
    if let Some(email) = &args.email {
        identity = identity.with_email(email);
    }
    if let Some(address) = &args.address {
        identity = identity.with_wallet_address(address);
    }

    let result = ctx
        .session()
        .login_with_identity_wallet(identity, &args.token)
        .await;
    report(&ctx, result, cli)
}

/// Runs the logout command.
pub async fn logout(cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    ctx.session().logout().await;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&SessionOutput {
            authenticated: false,
            identity: None,
            error: None,
            details: None,
        })?,
        OutputFormat::Text => {
            if !cli.quiet {
                println!("Signed out.");
            }
        }
    }
    Ok(ExitCode::Success)
}

/// Runs the whoami command.
pub async fn whoami(cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::load(cli).await?;
    let state = ctx.session().initialize().await;

    match ctx.format {
        OutputFormat::Json => ctx.print_json(&SessionOutput {
            authenticated: state.is_authenticated(),
            identity: state.identity(),
            error: None,
            details: None,
        })?,
        OutputFormat::Text => match &state {
            SessionState::Authenticated(identity) => {
                println!("{}", ctx.text.format_identity(identity));
                println!("Backend: {}", ctx.settings.base_url);
            }
            _ => println!("Not signed in."),
        },
    }

    Ok(if state.is_authenticated() {
        ExitCode::Success
    } else {
        ExitCode::NotAuthenticated
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn report(ctx: &AppContext, result: Result<Identity, AuthFailure>, cli: &Cli) -> Result<ExitCode> {
    match ctx.format {
        OutputFormat::Json => {
            let (identity, failure) = match &result {
                Ok(identity) => (Some(identity), None),
                Err(failure) => (None, Some(failure)),
            };
            ctx.print_json(&SessionOutput {
                authenticated: identity.is_some(),
                identity,
                error: failure.map(|f| f.message.as_str()),
                details: failure.and_then(|f| f.details.as_ref()),
            })?;
        }
        OutputFormat::Text => match &result {
            Ok(identity) => {
                if !cli.quiet {
                    println!("Signed in as {}", ctx.text.format_identity(identity));
                }
            }
            Err(failure) => eprintln!("{}", ctx.text.format_failure(&failure.message)),
        },
    }

    Ok(if result.is_ok() {
        ExitCode::Success
    } else {
        ExitCode::Error
    })
}

/// Reads one line from stdin after printing a prompt to stderr.
fn prompt(label: &str) -> Result<String> {
    eprint!("{label}: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let value = line.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("{label} is required");
    }
    Ok(value)
}
