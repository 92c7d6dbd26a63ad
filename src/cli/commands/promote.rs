use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::{output_success, ApiClient};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum PromoteCommands {
    #[command(about = "Run the annual batch promotion")]
    Annual {
        #[arg(long, help = "Target academic year (defaults to next year)")]
        year: Option<i32>,
        #[arg(long, help = "Restrict to one tenant")]
        tenant: Option<String>,
    },

    #[command(about = "Promote a single class into next year")]
    Class {
        #[arg(help = "Class id")]
        id: String,
    },

    #[command(about = "List the classes the next batch would promote")]
    Preview {
        #[arg(long, help = "Restrict to one tenant")]
        tenant: Option<String>,
    },

    #[command(about = "Mark qualifying active classes ready for promotion")]
    Readiness {
        #[arg(long, help = "Reference academic year (defaults to current year)")]
        year: Option<i32>,
        #[arg(long, help = "Restrict to one tenant")]
        tenant: Option<String>,
    },
}

pub async fn handle(cmd: PromoteCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PromoteCommands::Annual { year, tenant } => {
            let summary = client
                .post("/annual-promotion", json!({ "year": year, "tenant": tenant }))
                .await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => print_summary(&summary),
            }
            Ok(())
        }
        PromoteCommands::Class { id } => {
            let result = client.post(&format!("/promote-class/{}", id), json!({})).await?;
            let message = result["message"].as_str().unwrap_or("Class promoted").to_string();
            output_success(&output_format, &message, Some(result))
        }
        PromoteCommands::Preview { tenant } => {
            let query: Vec<(&str, String)> = tenant.into_iter().map(|t| ("tenant", t)).collect();
            let preview = client.get("/promotion-preview", &query).await?;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&preview)?),
                OutputFormat::Text => print_preview(&preview),
            }
            Ok(())
        }
        PromoteCommands::Readiness { year, tenant } => {
            let body = client
                .post("/promotion-readiness", json!({ "year": year, "tenant": tenant }))
                .await?;
            let data = body["data"].clone();
            let message = format!(
                "{} classes marked ready for {}",
                data["updated"].as_u64().unwrap_or(0),
                data["year"]
            );
            output_success(&output_format, &message, Some(data))
        }
    }
}

fn print_summary(summary: &Value) {
    println!(
        "Promotion into {}: {} promoted, {} skipped, {} failed (of {})",
        summary["targetYear"], summary["promoted"], summary["skipped"], summary["failed"], summary["total"]
    );
    if let Some(promoted) = summary["promotedClasses"].as_array() {
        for class in promoted {
            println!("  {} -> {}", class["fromClassName"].as_str().unwrap_or("?"), class["toClassName"].as_str().unwrap_or("?"));
        }
    }
    if let Some(failures) = summary["failures"].as_array() {
        for failure in failures {
            println!("  ✗ {}: {}", failure["className"].as_str().unwrap_or("?"), failure["error"].as_str().unwrap_or(""));
        }
    }
    if summary["truncated"].as_bool().unwrap_or(false) {
        println!("  {} classes remain; run again to continue", summary["remaining"]);
    }
}

fn print_preview(preview: &Value) {
    println!(
        "{} classes eligible for {}",
        preview["eligibleCount"], preview["targetYear"]
    );
    if let Some(classes) = preview["classes"].as_array() {
        for class in classes {
            println!("  {} ({})", class["className"].as_str().unwrap_or("?"), class["classCode"].as_str().unwrap_or("?"));
        }
    }
}
