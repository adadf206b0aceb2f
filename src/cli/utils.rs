use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
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
pub fn output_empty_collection(output_format: &OutputFormat, key: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut body = serde_json::Map::new();
            body.insert(key.to_string(), json!([]));
            println!("{}", serde_json::to_string_pretty(&Value::Object(body))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Indented outline line for a tree node, two spaces per level
pub fn outline_line(level: usize, label: &str) -> String {
    format!("{}{}", "  ".repeat(level), label)
}
