use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims, TenantMembership};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a signed token using the configured JWT secret")]
    Issue {
        #[arg(long, default_value = "Developer", help = "Display name")]
        name: String,
        #[arg(long = "role", help = "Global role, repeatable (e.g. super-admin)")]
        roles: Vec<String>,
        #[arg(long = "tenant", help = "Tenant membership, repeatable")]
        tenants: Vec<String>,
        #[arg(long, help = "Lifetime in hours (defaults to configured expiry)")]
        hours: Option<u64>,
    },
}

pub fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Issue {
            name,
            roles,
            tenants,
            hours,
        } => {
            let security = &config().security;
            let memberships = tenants
                .into_iter()
                .map(|tenant| TenantMembership { tenant, roles: vec![] })
                .collect();
            let claims = Claims::new(
                Uuid::new_v4(),
                name,
                roles,
                memberships,
                hours.unwrap_or(security.jwt_expiry_hours),
            );
            let token = generate_jwt(&claims, &security.jwt_secret)?;

            match output_format {
                OutputFormat::Json => output_success(
                    &output_format,
                    "Token issued",
                    Some(json!({ "token": token, "sub": claims.sub, "exp": claims.exp })),
                ),
                OutputFormat::Text => {
                    println!("{}", token);
                    Ok(())
                }
            }
        }
    }
}
