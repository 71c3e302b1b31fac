//! Blemish CLI - offline-first defect capture for quality inspection
//!
//! Every mutation lands in the local store immediately; `blemish sync now`
//! replays the queued operations once the server is reachable.

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{
    CatalogCommands, Cli, Commands, DefectCommands, ItemCommands, SessionCommands, SyncCommands,
};
use crate::commands::common::open_service;
use crate::config::CliConfig;
use crate::error::CliError;

mod cli;
mod commands;
mod config;
mod error;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blemish_core=info".parse().unwrap())
                .add_directive("blemish_cli=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::load()?;
    let db_path = resolve_db_path(cli.db_path, &config);
    let offline = cli.offline || env_flag("BLEMISH_OFFLINE");
    tracing::debug!(path = %db_path.display(), offline, "resolved local database");

    match cli.command {
        Commands::Session { command } => {
            let service = open_service(&db_path).await?;
            match command {
                SessionCommands::Start {
                    product,
                    workstation,
                    inspector,
                } => commands::session::run_start(&service, product, workstation, &inspector).await?,
                SessionCommands::Pause { id } => {
                    commands::session::run_pause(&service, &id).await?;
                }
                SessionCommands::Resume { id } => {
                    commands::session::run_resume(&service, &id).await?;
                }
                SessionCommands::Close { id } => {
                    commands::session::run_close(&service, &id).await?;
                }
                SessionCommands::Tick { id, seconds } => {
                    commands::session::run_tick(&service, &id, seconds).await?;
                }
                SessionCommands::List { limit, json } => {
                    commands::session::run_list(&service, limit, json).await?;
                }
            }
        }
        Commands::Item { command } => {
            let service = open_service(&db_path).await?;
            match command {
                ItemCommands::Add { session, defective } => {
                    commands::item::run_add(&service, &session, defective).await?;
                }
                ItemCommands::List { session, json } => {
                    commands::item::run_list(&service, &session, json).await?;
                }
            }
        }
        Commands::Defect { command } => {
            let service = open_service(&db_path).await?;
            match command {
                DefectCommands::Add {
                    item,
                    defect_type,
                    x,
                    y,
                    severity,
                    note,
                } => {
                    commands::defect::run_add(&service, &item, defect_type, x, y, severity, note)
                        .await?;
                }
                DefectCommands::Remove { id } => {
                    commands::defect::run_remove(&service, &id).await?;
                }
                DefectCommands::List { item, json } => {
                    commands::defect::run_list(&service, &item, json).await?;
                }
            }
        }
        Commands::Sync { command } => {
            let service = open_service(&db_path).await?;
            match command {
                SyncCommands::Now => {
                    commands::sync::run_now(&service, &config, offline).await?;
                }
                SyncCommands::Status { json } => {
                    commands::sync::run_status(&service, offline, json).await?;
                }
            }
        }
        Commands::Catalog { command } => {
            let service = open_service(&db_path).await?;
            match command {
                CatalogCommands::Refresh => {
                    commands::catalog::run_refresh(&service, &config).await?;
                }
                CatalogCommands::List => {
                    commands::catalog::run_list(&service).await?;
                }
            }
        }
        Commands::Completions { shell, output } => {
            commands::completions::run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}

fn resolve_db_path(explicit: Option<PathBuf>, config: &CliConfig) -> PathBuf {
    explicit
        .or_else(|| config.db_path.clone())
        .unwrap_or_else(config::default_db_path)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            value == "1" || value == "true" || value == "yes"
        })
        .unwrap_or(false)
}
