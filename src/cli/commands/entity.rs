use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{output_empty_collection, outline_line};
use crate::cli::OutputFormat;
use crate::config;
use crate::database::DatabaseManager;
use crate::handlers::entity::{EntityHierarchyResponse, EntityResponse};
use crate::hierarchy::HierarchyNode;
use crate::services::EntityService;

#[derive(Subcommand)]
pub enum EntityCommands {
    #[command(about = "Print an entity and its descendants")]
    Tree {
        #[arg(help = "Root entity ID")]
        id: String,

        #[arg(long, help = "Levels to print below the root")]
        max_depth: Option<u32>,
    },

    #[command(about = "List descendants of an entity")]
    Children {
        #[arg(help = "Parent entity ID")]
        id: String,

        #[arg(long, default_value_t = 0, allow_hyphen_values = true, help = "0 direct, -1 all, n levels")]
        level: i32,

        #[arg(long = "type", help = "Only entities of this category kind")]
        kind: Option<String>,
    },
}

pub async fn handle(cmd: EntityCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = EntityService::from_pool(DatabaseManager::main_pool().await?);

    match cmd {
        EntityCommands::Tree { id, max_depth } => {
            let tree = service.get_entity_hierarchy(&id).await?;
            let levels = config::config().hierarchy.render_depth(max_depth);

            match output_format {
                OutputFormat::Json => {
                    let rendered = EntityHierarchyResponse::render(&tree, levels);
                    println!("{}", serde_json::to_string_pretty(&rendered)?);
                }
                OutputFormat::Text => {
                    for line in outline(&tree, levels) {
                        println!("{}", line);
                    }
                }
            }
            Ok(())
        }
        EntityCommands::Children { id, level, kind } => {
            let children = service
                .list_entity_children(&id, level, kind.as_deref().unwrap_or_default())
                .await?;

            if children.is_empty() {
                return output_empty_collection(&output_format, "children", "No child entities");
            }

            match output_format {
                OutputFormat::Json => {
                    let children: Vec<EntityResponse> = children.into_iter().map(Into::into).collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "count": children.len(), "children": children }))?
                    );
                }
                OutputFormat::Text => {
                    println!("{:<38} {:<6} {}", "ID", "DEPTH", "NAME");
                    println!("{}", "-".repeat(70));
                    for entity in &children {
                        println!("{:<38} {:<6} {}", entity.id, entity.depth(), entity.name);
                    }
                }
            }
            Ok(())
        }
    }
}

/// Pre-order outline of `tree`, cut `levels` below the root
fn outline(tree: &HierarchyNode, levels: u32) -> Vec<String> {
    let mut lines = vec![outline_line(0, &label(tree))];
    for node in tree.descendants() {
        let level = (node.depth - tree.depth).max(0) as usize;
        if level <= levels as usize {
            lines.push(outline_line(level, &label(node)));
        }
    }
    lines
}

fn label(node: &HierarchyNode) -> String {
    format!("{} [{}] {}", node.name, node.category.kind, node.id)
}
