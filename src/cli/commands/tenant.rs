use std::sync::Arc;

use clap::Subcommand;
use serde_json::json;

use crate::app::AppState;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config;
use crate::tenancy::TenantSlug;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Register a restaurant and provision its partition")]
    Provision {
        #[arg(help = "Restaurant display name")]
        display_name: String,

        #[arg(long, help = "Explicit slug (derived from the display name when omitted)")]
        slug: Option<String>,
    },

    #[command(about = "Drop a restaurant's partition and registry entry")]
    Deprovision {
        #[arg(help = "Tenant slug")]
        slug: String,
    },

    #[command(about = "List registered restaurants")]
    List,

    #[command(about = "Show one restaurant")]
    Show {
        #[arg(help = "Tenant slug")]
        slug: String,
    },
}

pub async fn handle(cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = AppState::connect(Arc::new(config::config().clone())).await?;
    let service = state.tenants.clone();

    let result = match cmd {
        TenantCommands::Provision { display_name, slug } => {
            let tenant = match slug {
                Some(raw) => {
                    let slug = TenantSlug::parse(&raw)?;
                    service.provision_tenant(&slug, &display_name).await?
                }
                None => service.signup(&display_name).await?,
            };
            output_success(
                &output_format,
                &format!("Provisioned '{}' as {}", tenant.display_name, tenant.slug),
                Some(json!(tenant)),
            )
        }
        TenantCommands::Deprovision { slug } => {
            let slug = TenantSlug::parse(&slug)?;
            service.deprovision_tenant(&slug).await?;
            output_success(&output_format, &format!("Deprovisioned {}", slug), None)
        }
        TenantCommands::List => {
            let tenants = service.list_tenants().await?;
            if tenants.is_empty() {
                output_empty_collection(&output_format, "tenants", "No tenants registered")
            } else {
                match output_format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&json!({ "tenants": tenants }))?);
                    }
                    OutputFormat::Text => print_tenant_table(&tenants),
                }
                Ok(())
            }
        }
        TenantCommands::Show { slug } => {
            let slug = TenantSlug::parse(&slug)?;
            let tenant = service.get_tenant(&slug).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tenant)?),
                OutputFormat::Text => print_tenant(&tenant),
            }
            Ok(())
        }
    };

    state.registry.close_all().await;
    result
}
