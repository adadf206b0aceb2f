use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::{schema, DatabaseManager};

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::main_pool().await?;
    schema::apply(&pool).await?;

    output_success(
        &output_format,
        "Schema applied",
        Some(json!({ "statements": schema::STATEMENTS.len() })),
    )
}
