//! Photostock CLI - database migrations and shop management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront migrations (schema and session table)
//! ps-cli migrate
//!
//! # Load or refresh catalog photos from YAML
//! ps-cli catalog seed crates/cli/seed/photos.yaml
//!
//! # Give a user the customer capability
//! ps-cli groups grant 42
//! ps-cli groups revoke 42 --group customers
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use photostock_core::UserId;

mod commands;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(author, version, about = "Photostock CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage catalog photos
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage user group membership
    Groups {
        #[command(subcommand)]
        action: GroupAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Insert or update photos from a YAML file
    Seed {
        /// Path to the YAML file (list of id, caption, price, `image_url`)
        file: String,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    /// Add a user to a group
    Grant {
        /// Account id from the accounts service
        user_id: UserId,

        #[arg(short, long, default_value = "customers")]
        group: String,
    },
    /// Remove a user from a group
    Revoke {
        /// Account id from the accounts service
        user_id: UserId,

        #[arg(short, long, default_value = "customers")]
        group: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Catalog { action } => match action {
            CatalogAction::Seed { file } => {
                commands::seed::catalog(&file).await?;
            }
        },
        Commands::Groups { action } => match action {
            GroupAction::Grant { user_id, group } => {
                commands::groups::grant(user_id, &group).await?;
            }
            GroupAction::Revoke { user_id, group } => {
                commands::groups::revoke(user_id, &group).await?;
            }
        },
    }
    Ok(())
}
