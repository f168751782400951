//! Souq CLI - migrations, offline reports and platform admin management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (postgres backend)
//! souq migrate
//!
//! # Fee breakdown for one order
//! souq fees --price 1000 --cost 600 --shipping-fee 50 \
//!     --cod-threshold 500 --cod-rate 0.01 --cod-tax 0.14 \
//!     --insurance-rate 0.01 --insured --inspection-fee 20
//!
//! # Customer profiles from an exported store document
//! souq customers store.json
//!
//! # Check the cached wallet balance of an exported store document
//! souq wallet reconcile store.json --write
//!
//! # Grant platform admin rights
//! souq admin promote 01012345678
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `fees` - Fee and net profit calculation
//! - `customers` - Customer profiles and segments
//! - `wallet reconcile` - Wallet balance drift report
//! - `admin promote` / `admin demote` - Platform admin flag

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::fees::FeeArgs;

#[derive(Parser)]
#[command(name = "souq")]
#[command(author, version, about = "Souq CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Compute courier fees and net profit for one order
    Fees(FeeArgs),
    /// Aggregate customer profiles from a store document
    Customers {
        /// Path to a store document (JSON)
        file: PathBuf,
    },
    /// Wallet tools
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Manage platform admins
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum WalletAction {
    /// Compare the cached balance with the ledger
    Reconcile {
        /// Path to a store document (JSON)
        file: PathBuf,

        /// Write the corrected document back
        #[arg(long)]
        write: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Make a user a platform admin
    Promote {
        /// Phone number of the user
        phone: String,
    },
    /// Remove platform admin rights
    Demote {
        /// Phone number of the user
        phone: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Fees(args) => commands::print_json(&commands::fees::breakdown(&args))?,
        Commands::Customers { file } => {
            commands::print_json(&commands::reports::customers(&file)?)?;
        }
        Commands::Wallet { action } => match action {
            WalletAction::Reconcile { file, write } => {
                commands::print_json(&commands::reports::reconcile(&file, write)?)?;
            }
        },
        Commands::Admin { action } => match action {
            AdminAction::Promote { phone } => commands::admin::set_platform_admin(&phone, true).await?,
            AdminAction::Demote { phone } => commands::admin::set_platform_admin(&phone, false).await?,
        },
    }
    Ok(())
}
