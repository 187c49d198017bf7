use std::sync::Arc;

use clap::Args;
use serde_json::json;

use crate::app::AppState;
use crate::auth::{generate_jwt, Claims};
use crate::cli::OutputFormat;
use crate::config;
use crate::tenancy::TenantSlug;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(help = "Tenant slug for a staff token", required_unless_present = "root", conflicts_with = "root")]
    pub slug: Option<String>,

    #[arg(long, help = "Mint a root token for /api/root routes")]
    pub root: bool,

    #[arg(long, default_value = "restro-cli", help = "Token subject")]
    pub subject: String,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = config::config();
    let expiry = config.security.jwt_expiry_hours;

    let claims = match args.slug {
        Some(raw) => {
            // Staff tokens carry the restaurant id, so the tenant must exist
            let slug = TenantSlug::parse(&raw)?;
            let state = AppState::connect(Arc::new(config.clone())).await?;
            let tenant = state.tenants.get_tenant(&slug).await?;
            Claims::staff(args.subject, slug.as_str(), tenant.id, expiry)
        }
        None => Claims::root(args.subject, expiry),
    };

    let token = generate_jwt(&claims, &config.security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "token": token, "claims": claims }))?
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
