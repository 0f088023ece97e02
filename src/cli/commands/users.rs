use clap::Subcommand;
use serde_json::json;

use crate::admin::{access_editable_for, RoleDraft, UserEditor};
use crate::api::contracts::UserRecord;
use crate::api::users::{self, UserSearchParams};
use crate::cli::utils::*;
use crate::cli::{CliContext, OutputFormat};
use crate::error::ClientError;
use crate::session::SessionContext;
use crate::types::{Permission, Role, UserId};

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List users")]
    List {
        #[arg(long, help = "First name contains")]
        firstname: Option<String>,
        #[arg(long, help = "Last name contains")]
        lastname: Option<String>,
        #[arg(long, help = "Email contains")]
        email: Option<String>,
        #[arg(long, help = "Filter by enabled flag")]
        enabled: Option<bool>,
        #[arg(long, help = "Users holding this role (manager, staff, user)")]
        role: Option<Role>,
        #[arg(long, help = "Users holding this permission")]
        permission: Option<Permission>,
        #[arg(long, help = "Zero-based page number")]
        page: Option<u32>,
    },

    #[command(about = "Show one user with roles and permissions")]
    Show {
        #[arg(help = "User ID")]
        id: UserId,
    },

    #[command(about = "Edit profile fields, roles and permissions")]
    Edit {
        #[arg(help = "User ID")]
        id: UserId,
        #[arg(long, help = "New first name")]
        firstname: Option<String>,
        #[arg(long, help = "New last name")]
        lastname: Option<String>,
        #[arg(long, conflicts_with = "disable", help = "Enable the account")]
        enable: bool,
        #[arg(long, help = "Disable the account")]
        disable: bool,
        #[arg(long = "add-role", help = "Role to add (repeatable)")]
        add_role: Vec<Role>,
        #[arg(long = "remove-role", help = "Role to remove (repeatable)")]
        remove_role: Vec<Role>,
        #[arg(long, help = "Grant ROLE:PERMISSION (repeatable)")]
        grant: Vec<String>,
        #[arg(long, help = "Revoke ROLE:PERMISSION (repeatable)")]
        revoke: Vec<String>,
        #[arg(long, help = "Print the planned changes without applying them")]
        dry_run: bool,
    },
}

/// Role and permission edits requested on the command line
#[derive(Debug, Default)]
struct AccessFlags {
    add_roles: Vec<Role>,
    remove_roles: Vec<Role>,
    grants: Vec<(Role, Permission)>,
    revokes: Vec<(Role, Permission)>,
}

impl AccessFlags {
    fn is_empty(&self) -> bool {
        self.add_roles.is_empty()
            && self.remove_roles.is_empty()
            && self.grants.is_empty()
            && self.revokes.is_empty()
    }

    /// Removals first so a role can be swapped in one call, then grants
    /// and revokes against the resulting selection
    fn apply_to(&self, draft: &mut RoleDraft) -> Result<(), ClientError> {
        for role in &self.remove_roles {
            draft.set_role(*role, false);
        }
        for role in &self.add_roles {
            draft.set_role(*role, true);
        }
        for (role, permission) in &self.grants {
            draft.set_permission(*role, *permission, true)?;
        }
        for (role, permission) in &self.revokes {
            draft.set_permission(*role, *permission, false)?;
        }
        Ok(())
    }
}

/// Parse `ROLE:PERMISSION`, e.g. `staff:view-coupon`
fn parse_role_permission(input: &str) -> Result<(Role, Permission), ClientError> {
    let (role, permission) = input.split_once(':').ok_or_else(|| {
        ClientError::invalid_input(format!("expected ROLE:PERMISSION, got '{}'", input))
    })?;
    Ok((role.parse()?, permission.parse()?))
}

fn user_fields(user: &UserRecord) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("id", user.id.map(|id| id.to_string()).unwrap_or_default()),
        ("name", format!("{} {}", user.firstname, user.lastname)),
        ("email", user.email.clone()),
        ("enabled", user.enabled.to_string()),
        ("created", user.created_at.clone()),
        ("updated", user.updated_at.clone()),
    ];
    for role in &user.roles {
        let permissions = user
            .permissions_for(*role)
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(", ");
        fields.push((role.label(), permissions));
    }
    fields
}

pub async fn handle(cmd: UserCommands, ctx: &CliContext) -> anyhow::Result<()> {
    match cmd {
        UserCommands::List { firstname, lastname, email, enabled, role, permission, page } => {
            let params = UserSearchParams {
                firstname,
                lastname,
                email,
                enabled,
                role_name: role,
                permission_name: permission,
                page,
                ..Default::default()
            };
            let page = users::fetch_users(&ctx.gateway, &params).await?;

            match ctx.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
                OutputFormat::Text => {
                    output_collection(&ctx.output, "users", &page.content, "No users found", |user| {
                        let roles = user.roles.iter().map(|r| r.label()).collect::<Vec<_>>().join(",");
                        let status = if user.enabled { "" } else { "disabled" };
                        format!(
                            "{:>6}  {:<30} {:<35} {:<22} {}",
                            user.id.map(|id| id.to_string()).unwrap_or_default(),
                            format!("{} {}", user.firstname, user.lastname),
                            user.email,
                            roles,
                            status
                        )
                    })?;
                    println!("{}", page_footer(page.page_number, page.total_pages, page.total_elements));
                }
            }
            Ok(())
        }
        UserCommands::Show { id } => {
            let user = users::fetch_user(&ctx.gateway, id).await?;
            output_record(&ctx.output, &user, &user_fields(&user))
        }
        UserCommands::Edit {
            id,
            firstname,
            lastname,
            enable,
            disable,
            add_role,
            remove_role,
            grant,
            revoke,
            dry_run,
        } => {
            let flags = AccessFlags {
                add_roles: add_role,
                remove_roles: remove_role,
                grants: grant.iter().map(|g| parse_role_permission(g)).collect::<Result<_, _>>()?,
                revokes: revoke.iter().map(|r| parse_role_permission(r)).collect::<Result<_, _>>()?,
            };

            let session = SessionContext::load(ctx.store())
                .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'bookstore auth login' first"))?;
            let mut editor = UserEditor::load(&ctx.gateway, id, access_editable_for(&session)).await?;

            if let Some(firstname) = firstname {
                editor.firstname = firstname;
            }
            if let Some(lastname) = lastname {
                editor.lastname = lastname;
            }
            if enable {
                editor.enabled = true;
            }
            if disable {
                editor.enabled = false;
            }

            if !flags.is_empty() {
                let draft = editor
                    .draft_mut()
                    .ok_or_else(|| anyhow::anyhow!("Only managers can change roles and permissions"))?;
                flags.apply_to(draft)?;
            }

            let operations = editor.plan().operations();

            if dry_run {
                match ctx.output {
                    OutputFormat::Json => {
                        let plan = json!({
                            "user_id": id,
                            "profile": editor.profile_update(),
                            "operations": operations,
                        });
                        println!("{}", serde_json::to_string_pretty(&plan)?);
                    }
                    OutputFormat::Text => {
                        let profile = editor.profile_update();
                        println!(
                            "PUT /api/users/{}: {} {} (enabled: {})",
                            id, profile.firstname, profile.lastname, profile.enabled
                        );
                        if operations.is_empty() {
                            println!("No role or permission changes");
                        }
                        for (i, operation) in operations.iter().enumerate() {
                            println!("{:>2}. {}", i + 1, operation);
                        }
                    }
                }
                return Ok(());
            }

            let outcome = editor.save(&ctx.gateway).await?;
            let applied = outcome.applied.iter().map(|m| m.to_string()).collect::<Vec<_>>();
            match ctx.output {
                OutputFormat::Json => output_success(
                    &ctx.output,
                    &format!("User {} saved", id),
                    Some(json!({ "user": outcome.user, "applied": outcome.applied })),
                ),
                OutputFormat::Text => {
                    output_success(&ctx.output, &format!("User {} saved", id), None)?;
                    for line in applied {
                        println!("  {}", line);
                    }
                    Ok(())
                }
            }
        }
    }
}
