pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "school")]
#[command(about = "School CLI - promotion runs, grading and development tokens")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "SCHOOL_API_URL",
        default_value = "http://localhost:3000",
        help = "Base URL of the School API"
    )]
    pub server: String,

    #[arg(long, global = true, env = "SCHOOL_API_TOKEN", help = "Bearer token for protected routes")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Annual and manual class promotion")]
    Promote {
        #[command(subcommand)]
        cmd: commands::promote::PromoteCommands,
    },

    #[command(about = "Grade a score locally without contacting the server")]
    Grade(commands::grade::GradeArgs),

    #[command(about = "Development token management")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json && !cli.text {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Promote { cmd } => {
            let client = utils::ApiClient::new(&cli.server, cli.token)?;
            commands::promote::handle(cmd, &client, output_format).await
        }
        Commands::Grade(args) => commands::grade::handle(args, output_format),
        Commands::Token { cmd } => commands::token::handle(cmd, output_format),
    }
}
