//! `esgadmin` — inspect the logged-in admin's identity and permissions.

mod commands;

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use esgadmin_auth::{PermissionResolver, ResolverConfig};
use esgadmin_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "esgadmin", version, about = "ESG admin console permission tools")]
struct Cli {
    /// Emit logs as JSON instead of compact text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the verified identity behind the stored credential.
    Whoami {
        /// Bypass the cached identity.
        #[arg(long)]
        refresh: bool,
    },
    /// Check one or more permissions (exit status 1 when denied).
    Check {
        #[arg(required = true)]
        permissions: Vec<String>,
        /// Succeed when any permission is held instead of all of them.
        #[arg(long)]
        any: bool,
        /// Print the rule that decided each permission.
        #[arg(long)]
        explain: bool,
    },
    /// List the effective permission set.
    Permissions,
    /// Print the role table (no network access).
    Roles,
    /// Store a credential for later commands.
    Login {
        #[arg(long)]
        token: String,
        /// Role to show before the identity is verified.
        #[arg(long)]
        role: Option<String>,
    },
    /// Forget the stored credential and all session state.
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    esgadmin_observability::init_with(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    });

    let config = ResolverConfig::from_env().context("invalid configuration")?;
    tracing::debug!(api_url = %config.api_url, session_file = %config.session_file.display(), "configuration loaded");

    let resolver =
        PermissionResolver::from_config(&config).context("failed to build identity client")?;

    match cli.command {
        Command::Whoami { refresh } => commands::whoami(&resolver, refresh).await,
        Command::Check {
            permissions,
            any,
            explain,
        } => commands::check(&resolver, permissions, any, explain).await,
        Command::Permissions => commands::permissions(&resolver).await,
        Command::Login { token, role } => commands::login(&resolver, &token, role.as_deref()),
        Command::Logout => commands::logout(&resolver),
        Command::Roles => commands::roles(),
    }
}
