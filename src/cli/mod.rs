pub mod commands;
pub mod config;
pub mod prompt;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::Gateway;
use crate::error::ClientError;
use crate::session::store::CredentialStore;

#[derive(Parser)]
#[command(name = "bookstore")]
#[command(about = "Bookstore CLI - catalog search, sessions and user administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Bookstore API base URL (overrides BOOKSTORE_API_URL)")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Authentication and token management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Search and inspect books")]
    Books {
        #[command(subcommand)]
        cmd: commands::books::BookCommands,
    },

    #[command(about = "Search authors")]
    Authors {
        #[command(subcommand)]
        cmd: commands::authors::AuthorCommands,
    },

    #[command(about = "User, role and permission administration")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Shared handles for command handlers
pub struct CliContext {
    pub gateway: Gateway,
    pub output: OutputFormat,
}

impl CliContext {
    pub fn store(&self) -> &dyn CredentialStore {
        self.gateway.store().as_ref()
    }
}

fn build_context(cli: &Cli) -> anyhow::Result<CliContext> {
    let mut client_config = crate::config::config().clone();
    if let Some(url) = &cli.api_url {
        client_config.api.base_url = url.trim_end_matches('/').to_string();
    }

    let store: Arc<dyn CredentialStore> = Arc::new(config::open_session_store()?);
    let gateway = Gateway::from_config(&client_config, store)?;

    Ok(CliContext {
        gateway,
        output: OutputFormat::from_cli(cli),
    })
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = build_context(&cli)?;

    let result = match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, &ctx).await,
        Commands::Books { cmd } => commands::books::handle(cmd, &ctx).await,
        Commands::Authors { cmd } => commands::authors::handle(cmd, &ctx).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &ctx).await,
    };

    if let (Err(e), OutputFormat::Json) = (&result, &ctx.output) {
        let code = e.downcast_ref::<ClientError>().map(ClientError::error_code);
        utils::output_error(&ctx.output, &e.to_string(), code)?;
    }
    result
}
