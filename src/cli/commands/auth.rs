use clap::Subcommand;
use serde_json::json;

use crate::api::contracts::{LoginRequest, RegisterRequest};
use crate::api::users;
use crate::cli::prompt::{resolve_password, StdinRoleChooser};
use crate::cli::utils::*;
use crate::cli::{CliContext, OutputFormat};
use crate::error::ClientError;
use crate::session::{self, SessionContext, StorageKey};

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the bookstore")]
    Login {
        #[arg(help = "Username (email)")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout and forget stored credentials")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Refresh the access token")]
    Refresh,

    #[command(about = "Show current user information")]
    Whoami,

    #[command(about = "Register a new account")]
    Register {
        #[arg(help = "First name")]
        firstname: String,
        #[arg(help = "Last name")]
        lastname: String,
        #[arg(help = "Email")]
        email: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },
}

fn print_session(output_format: &OutputFormat, message: &str, context: &SessionContext) -> anyhow::Result<()> {
    let role = context
        .active_role
        .map(|r| r.label().to_string())
        .unwrap_or_else(|| "none".to_string());

    match output_format {
        OutputFormat::Json => output_success(output_format, message, Some(json!({ "session": context }))),
        OutputFormat::Text => {
            output_success(output_format, message, None)?;
            println!("  user:        {} {} <{}>", context.firstname, context.lastname, context.email);
            println!("  role:        {}", role);
            println!("  permissions: {}", context.permissions.len());
            Ok(())
        }
    }
}

pub async fn handle(cmd: AuthCommands, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            let request = LoginRequest {
                username,
                password: resolve_password(password).await?,
            };
            let context = session::login(&ctx.gateway, &StdinRoleChooser, &request).await?;
            print_session(&ctx.output, &format!("Logged in as {}", context.username), &context)
        }
        AuthCommands::Register { firstname, lastname, email, password } => {
            let request = RegisterRequest {
                firstname,
                lastname,
                email,
                password: resolve_password(password).await?,
            };
            let context = session::register(&ctx.gateway, &StdinRoleChooser, &request).await?;
            print_session(&ctx.output, &format!("Registered {}", context.username), &context)
        }
        AuthCommands::Logout => {
            session::logout(ctx.store())?;
            output_success(&ctx.output, "Logged out", None)
        }
        AuthCommands::Status => {
            let has_token = ctx.store().get(StorageKey::AccessToken).is_some();
            match SessionContext::load(ctx.store()) {
                Some(context) if has_token => print_session(&ctx.output, "Authenticated", &context),
                _ => match ctx.output {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&json!({ "authenticated": false }))?);
                        Ok(())
                    }
                    OutputFormat::Text => {
                        println!("Not logged in");
                        Ok(())
                    }
                },
            }
        }
        AuthCommands::Refresh => match ctx.gateway.refresh_access_token().await? {
            Some(_) => output_success(&ctx.output, "Access token refreshed", None),
            None => Err(ClientError::Unauthorized.into()),
        },
        AuthCommands::Whoami => {
            let context = SessionContext::load(ctx.store())
                .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'bookstore auth login' first"))?;
            let user = users::fetch_user(&ctx.gateway, context.user_id).await?;

            let roles = user.roles.iter().map(|r| r.label()).collect::<Vec<_>>().join(", ");
            let active = context.active_role.map(|r| r.label()).unwrap_or("none");
            output_record(
                &ctx.output,
                &user,
                &[
                    ("id", context.user_id.to_string()),
                    ("name", format!("{} {}", user.firstname, user.lastname)),
                    ("email", user.email.clone()),
                    ("roles", roles),
                    ("active role", active.to_string()),
                    ("enabled", user.enabled.to_string()),
                ],
            )
        }
    }
}
