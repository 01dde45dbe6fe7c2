//! passporter - command-line client for PassPorter
//!
//! Browse border points, submit and report on them, manage the signed-in
//! session, and run the live map sync against a replayed device track.

mod auth;
mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::points::run_points;
use crate::commands::report::run_report;
use crate::commands::updates::run_updates;
use crate::commands::watch::{run_watch, WatchOptions};
use crate::error::CliError;

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
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("passporter=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let db_path = cli.db_path;

    match cli.command {
        Commands::Points(command) => run_points(command, config_path, db_path).await?,
        Commands::Report {
            id,
            status,
            message,
        } => run_report(&id, &status, &message, config_path, db_path).await?,
        Commands::Updates {
            id,
            limit,
            offline,
            json,
        } => run_updates(&id, limit, offline, json, config_path, db_path).await?,
        Commands::Auth(command) => run_auth(command, config_path, db_path).await?,
        Commands::Watch {
            track,
            step_secs,
            bounds,
            zoom,
            duration_secs,
            no_permission,
        } => {
            let options = WatchOptions {
                track,
                step_secs,
                bounds,
                zoom,
                duration_secs,
                no_permission,
            };
            run_watch(options, config_path, db_path).await?;
        }
    }

    Ok(())
}
