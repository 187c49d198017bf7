use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::database::models::Tenant;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

pub fn print_tenant_table(tenants: &[Tenant]) {
    println!("{:<6} {:<28} {:<30} {:<8} {}", "ID", "SLUG", "DISPLAY NAME", "ACTIVE", "CREATED");
    println!("{}", "-".repeat(92));
    for tenant in tenants {
        println!(
            "{:<6} {:<28} {:<30} {:<8} {}",
            tenant.id,
            tenant.slug,
            tenant.display_name,
            if tenant.is_active { "yes" } else { "no" },
            tenant.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn print_tenant(tenant: &Tenant) {
    println!("Slug:         {}", tenant.slug);
    println!("Display name: {}", tenant.display_name);
    println!("Restaurant:   {}", tenant.id);
    println!("Partition:    {}", tenant.partition);
    println!("Active:       {}", tenant.is_active);
    println!("Created:      {}", tenant.created_at.format("%Y-%m-%d %H:%M:%S"));
}
