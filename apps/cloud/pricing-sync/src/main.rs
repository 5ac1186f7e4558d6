//! Pricing Sync
//!
//! Fetches live compute pricing from every configured provider and stores it
//! in `cloud_plans`. Runs once, on a cron schedule, or just previews what
//! the providers currently return.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_pricing::{CloudProvider, SyncOptions};
use eyre::Result;
use migration::Migrator;
use std::str::FromStr;
use tracing::info;

mod config;
mod runner;

use config::Config;
use runner::SyncRunner;

#[derive(Parser, Debug)]
#[command(name = "pricing-sync")]
#[command(about = "Sync cloud compute pricing into the plan store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Fetch and store plans once
    Sync {
        /// Providers to sync (aws, digitalocean, hetzner, scaleway, azure). Defaults to all.
        #[arg(short, long, value_delimiter = ',', value_parser = parse_provider)]
        providers: Vec<CloudProvider>,

        /// Delete stored plans before inserting
        #[arg(short, long)]
        clear: bool,
    },

    /// Run as a scheduled service
    Schedule {
        /// Cron expression with seconds (default: every 6 hours)
        #[arg(long, default_value = "0 0 */6 * * *")]
        cron: String,

        /// Delete stored plans before each insert
        #[arg(short, long)]
        clear: bool,
    },

    /// Show per-provider configuration and stored plan counts
    Status,

    /// Print the live aggregate as JSON without storing it
    Preview {
        #[arg(short, long, value_delimiter = ',', value_parser = parse_provider)]
        providers: Vec<CloudProvider>,

        /// Region hints passed to the adapters
        #[arg(short = 'R', long, value_delimiter = ',')]
        regions: Vec<String>,
    },
}

fn parse_provider(value: &str) -> Result<CloudProvider, String> {
    CloudProvider::from_str(value.trim()).map_err(|_| format!("unknown provider '{value}'"))
}

async fn connect() -> Result<database::postgres::DatabaseConnection> {
    info!("Connecting to database...");
    database::postgres::connect_from_config_with_retry(Config::database()?, None)
        .await
        .map_err(|e| eyre::eyre!("Database connection failed: {}", e))
}

async fn connect_and_migrate() -> Result<database::postgres::DatabaseConnection> {
    let db = connect().await?;
    database::postgres::run_migrations::<Migrator>(&db, "pricing-sync").await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    observability::init_metrics();

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let runner = SyncRunner::new(config, http);

    match cli.command {
        Commands::Sync { providers, clear } => {
            let db = connect_and_migrate().await?;
            info!("Starting one-time pricing sync");

            let report = runner
                .plan_sync(db)
                .run(&SyncOptions { providers, clear })
                .await?;

            info!(
                "Sync complete: {} fetched, {} inserted, {} cleared in {} batches ({} ms)",
                report.fetched, report.inserted, report.cleared, report.batches, report.duration_ms
            );
        }

        Commands::Schedule { cron, clear } => {
            let db = connect_and_migrate().await?;
            runner.run_scheduled(db, &cron, clear).await?;
        }

        Commands::Status => {
            let db = connect().await?;
            let status = runner.status(db).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }

        Commands::Preview { providers, regions } => {
            let plans = runner.preview(providers, regions).await;
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Commands, clap::Error> {
        Cli::try_parse_from(std::iter::once("pricing-sync").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn test_sync_parses_providers_and_clear() {
        assert_eq!(
            parse(&["sync", "--providers", "aws,Hetzner", "-c"]).unwrap(),
            Commands::Sync {
                providers: vec![CloudProvider::Aws, CloudProvider::Hetzner],
                clear: true,
            }
        );
        assert_eq!(
            parse(&["sync"]).unwrap(),
            Commands::Sync {
                providers: Vec::new(),
                clear: false,
            }
        );
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(parse(&["sync", "--providers", "oracle"]).is_err());
    }

    #[test]
    fn test_schedule_default_cron() {
        assert_eq!(
            parse(&["schedule"]).unwrap(),
            Commands::Schedule {
                cron: "0 0 */6 * * *".into(),
                clear: false,
            }
        );
    }

    #[test]
    fn test_preview_regions() {
        assert_eq!(
            parse(&["preview", "-p", "scaleway", "-R", "fr-par-1,nl-ams-1"]).unwrap(),
            Commands::Preview {
                providers: vec![CloudProvider::Scaleway],
                regions: vec!["fr-par-1".into(), "nl-ams-1".into()],
            }
        );
    }
}
