//! Ghostpost CLI
//!
//! Publishes Markdown documents with YAML front matter to a Ghost site.
//!
//! # Commands
//!
//! - `publish` - Create or update the post for one document
//! - `version` - Show version information

mod auth;
mod browser;
mod commands;
mod config;
mod http;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Publish Markdown to Ghost.
#[derive(Parser)]
#[command(name = "ghostpost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Ghost Admin API URL, e.g. https://example.com/ghost/api/admin/
    #[arg(global = true, long)]
    api_url: Option<String>,

    /// Admin API key (id:secret) or a pre-signed JWT
    #[arg(global = true, long)]
    admin_jwt: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a Markdown document to Ghost
    Publish {
        /// Markdown file
        #[arg(short, long)]
        file: PathBuf,

        /// Open the post in the Ghost editor afterwards
        #[arg(short, long)]
        editor: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Publish { file, editor } => {
            let overrides = config::Overrides {
                api_url: cli.api_url,
                admin_jwt: cli.admin_jwt,
            };
            let settings = config::Settings::load(overrides)?;
            commands::publish::run(&settings, &file, editor)?;
        }
        Commands::Version => {
            println!("Ghostpost CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Ghostpost Core v{}", ghostpost_core::VERSION);
        }
    }

    Ok(())
}
