use std::sync::Arc;

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crawlsync_common::{AttributeMap, ComparisonMode, Config, Frequency, RunContext};
use crawlsync_engine::{ReconcileDeps, ReconcileSpec, Reconciler, RunOutcome, Strategy};
use crawlsync_store::{
    PgRecordStore, PgSummaryStore, PgUrlRegistry, PgmqPublisher, StoreClient,
};

#[derive(Parser)]
#[command(
    name = "crawlsync",
    about = "Reconcile freshly crawled records against the master record set"
)]
struct Cli {
    /// Site whose partitions this run reconciles
    #[arg(long)]
    site: String,

    /// Crawl cadence of the source partition
    #[arg(long, default_value = "daily")]
    frequency: Frequency,

    /// Run date; defaults to today in the configured offset
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Run id; defaults to a fresh v4 UUID
    #[arg(long)]
    run_id: Option<Uuid>,

    /// full: already-stale records can be rediscovered as missing
    #[arg(long, default_value = "status_filtered")]
    mode: ComparisonMode,

    /// Copy-attribute list, e.g. "author,price!"; overrides COPY_ATTRIBUTES
    #[arg(long)]
    attributes: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish missing records to the re-fetch queue
    Requeue,
    /// Insert missing-record URLs into the registry
    Register,
    /// Upsert master from the source partition and mark absentees stale
    UpdateMaster,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("crawlsync=info".parse()?))
        .init();

    info!("Crawlsync reconciliation starting...");

    let cli = Cli::parse();
    let config = Config::from_env();

    let client = StoreClient::connect(&config.database_url).await?;

    // Everything after connect runs behind one close() on all exit paths.
    let outcome = run(&cli, &config, &client).await;
    client.close().await;
    let outcome = outcome?;

    println!("{outcome}");
    Ok(())
}

async fn run(cli: &Cli, config: &Config, client: &StoreClient) -> Result<RunOutcome> {
    client.migrate().await?;

    let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let run_date = cli
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&offset).date_naive());
    let ctx = RunContext::new(cli.run_id.unwrap_or_else(Uuid::new_v4), run_date, offset);

    let raw_attrs = cli.attributes.as_deref().unwrap_or(&config.copy_attributes);
    let attributes = AttributeMap::parse(raw_attrs)?;

    let spec = ReconcileSpec::builder()
        .site(cli.site.clone())
        .frequency(cli.frequency)
        .mode(cli.mode)
        .is_primary_site(cli.site == config.primary_site)
        .attributes(attributes)
        .build();

    let deps = ReconcileDeps {
        records: Arc::new(PgRecordStore::new(client.clone())),
        queue: Arc::new(PgmqPublisher::new(client, &config.queue_name).await?),
        registry: Arc::new(PgUrlRegistry::new(client.clone())),
        summaries: Arc::new(PgSummaryStore::new(client.clone())),
    };

    let strategy = match cli.command {
        Command::Requeue => Strategy::Requeue,
        Command::Register => Strategy::Register,
        Command::UpdateMaster => Strategy::UpdateMaster,
    };

    let reconciler = Reconciler::new(deps, spec, ctx);
    Ok(reconciler.run(strategy).await?)
}
