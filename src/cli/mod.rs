pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "zolaris")]
#[command(about = "Zolaris CLI - schema and hierarchy administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply the database schema")]
    Migrate,

    #[command(about = "Category catalog management")]
    Category {
        #[command(subcommand)]
        cmd: commands::category::CategoryCommands,
    },

    #[command(about = "Inspect the entity hierarchy")]
    Entity {
        #[command(subcommand)]
        cmd: commands::entity::EntityCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Category { cmd } => commands::category::handle(cmd, output_format).await,
        Commands::Entity { cmd } => commands::entity::handle(cmd, output_format).await,
    }
}
