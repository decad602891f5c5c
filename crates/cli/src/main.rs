//! Metaplan CLI - Database migrations and shop management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! metaplan-cli migrate
//!
//! # List installed shops
//! metaplan-cli shops list
//!
//! # Remove a shop's stored token
//! metaplan-cli shops remove --shop store.myshopify.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "metaplan-cli")]
#[command(author, version, about = "Metaplan CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage installed shops
    Shops {
        #[command(subcommand)]
        action: ShopsAction,
    },
}

#[derive(Subcommand)]
enum ShopsAction {
    /// List installed shops
    List,
    /// Remove a shop's stored session
    Remove {
        /// Shop domain (`store.myshopify.com`)
        #[arg(short, long)]
        shop: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Shops { action } => match action {
            ShopsAction::List => commands::shops::list().await?,
            ShopsAction::Remove { shop } => commands::shops::remove(&shop).await?,
        },
    }
    Ok(())
}
