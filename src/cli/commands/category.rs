use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;
use crate::handlers::category::CategoryResponse;
use crate::services::CategoryService;

#[derive(Subcommand)]
pub enum CategoryCommands {
    #[command(about = "Register a new category")]
    Add {
        #[arg(help = "Category name (2-50 characters)")]
        name: String,

        #[arg(long = "type", help = "Category kind, e.g. user, organization, location, office")]
        kind: String,
    },

    #[command(about = "List categories")]
    List {
        #[arg(long = "type", help = "Only categories of this kind")]
        kind: Option<String>,
    },
}

pub async fn handle(cmd: CategoryCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = CategoryService::from_pool(DatabaseManager::main_pool().await?);

    match cmd {
        CategoryCommands::Add { name, kind } => {
            let category = service.add_category(&name, &kind).await?;
            output_success(
                &output_format,
                &format!("Added category '{}' ({})", category.name, category.kind),
                Some(json!({ "category": CategoryResponse::from(category) })),
            )
        }
        CategoryCommands::List { kind } => {
            let categories = match kind {
                Some(kind) => service.get_categories_by_kind(&kind).await?,
                None => service.list_all_categories().await?,
            };

            if categories.is_empty() {
                return output_empty_collection(&output_format, "categories", "No categories found");
            }

            match output_format {
                OutputFormat::Json => {
                    let categories: Vec<CategoryResponse> = categories.into_iter().map(Into::into).collect();
                    println!("{}", serde_json::to_string_pretty(&json!({ "categories": categories }))?);
                }
                OutputFormat::Text => {
                    println!("{:<38} {:<15} {}", "ID", "TYPE", "NAME");
                    println!("{}", "-".repeat(70));
                    for category in &categories {
                        println!("{:<38} {:<15} {}", category.id, category.kind, category.name);
                    }
                }
            }
            Ok(())
        }
    }
}
