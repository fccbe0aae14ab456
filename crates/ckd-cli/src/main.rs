use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ckd_core::metrics::{assistant_summary, DashboardMetrics};
use ckd_store::PgOrderStore;
use ckd_sync::{clear_orders, load_orders_from_store, ClearOutcome, ClearRequest, KitchenConfig, SyncPipeline};
use ckd_web::assistant::{ask, AssistantConfig};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ckd-cli")]
#[command(about = "Cloud kitchen order dashboard")]
struct Cli {
    /// CSV file used when nothing has been uploaded (overrides ORDERS_CSV_PATH).
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web dashboard.
    Serve,
    /// Load the CSV and print its KPIs.
    Load,
    /// Insert CSV rows into the database, skipping known order ids.
    Sync,
    /// Delete every stored order.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Print the assistant context built from stored orders.
    Summary,
    /// Ask the local assistant a question about stored orders.
    Ask { question: String },
    /// Create the orders table.
    Migrate,
}

fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let mut config = KitchenConfig::from_env();
    if let Some(csv) = cli.csv {
        config.csv_path = csv;
    }
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    let store = Arc::new(PgOrderStore::new(config.database_url.clone()));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => ckd_web::serve(config).await?,
        Commands::Load => {
            let pipeline = SyncPipeline::new(config, store);
            let report = pipeline.load_csv(None).await?;
            println!("{}", report.diagnostic);
            let metrics = DashboardMetrics::compute(report.records());
            println!(
                "orders={} sales={:.2} avg_rating={} completion={:.1}%",
                metrics.total_orders,
                metrics.total_sales,
                metrics
                    .avg_rating
                    .map(|r| format!("{r:.2}"))
                    .unwrap_or_else(|| "n/a".into()),
                metrics.completion_rate
            );
            if report.diagnostic.is_error() {
                bail!("csv load failed");
            }
        }
        Commands::Sync => {
            let run = SyncPipeline::new(config, store).run_once(None).await?;
            println!("{}", run.load);
            println!("{}", run.sync.diagnostic);
            println!(
                "sync complete: run_id={} inserted={} skipped={}",
                run.sync.run_id, run.sync.outcome.inserted, run.sync.outcome.skipped
            );
            if run.sync.diagnostic.is_error() {
                bail!("sync failed");
            }
        }
        Commands::Clear { yes } => {
            let outcome = clear_orders(store.as_ref(), ClearRequest::from_confirmation(yes)).await;
            println!("{}", outcome.diagnostic());
            if matches!(outcome, ClearOutcome::Failed { .. }) {
                bail!("clear failed");
            }
        }
        Commands::Summary => {
            let report = load_orders_from_store(store.as_ref()).await;
            if report.diagnostic.is_error() {
                eprintln!("{}", report.diagnostic);
            }
            println!("{}", assistant_summary(report.records()));
        }
        Commands::Ask { question } => {
            let report = load_orders_from_store(store.as_ref()).await;
            let summary = assistant_summary(report.records());
            let reply = ask(&AssistantConfig::from_config(&config), &summary, &question).await;
            println!("{}", reply.text());
        }
        Commands::Migrate => {
            store.migrate().await.context("applying migrations")?;
            info!("migrations applied");
        }
    }

    Ok(())
}
