use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use votewallet_catalog::{CatalogStore, MemoryCatalog, PgCatalog};
use votewallet_common::Config;
use votewallet_harvest::adapters;
use votewallet_harvest::dedup;
use votewallet_harvest::monitor::Monitor;
use votewallet_harvest::orchestrator::{build_plan, Harvester, HarvestSettings};
use votewallet_harvest::rate_limit::RateLimiter;
use votewallet_harvest::registry::StateRegistry;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CatalogBackend {
    Memory,
    Postgres,
}

#[derive(Parser, Debug)]
#[command(name = "votewallet-harvest", about = "National business-data harvest")]
struct Cli {
    /// Override the national business target; state targets scale
    /// proportionally.
    #[arg(long)]
    target_count: Option<u32>,

    /// Harvest only this tier (1-4).
    #[arg(long)]
    tier: Option<u8>,

    /// Harvest only this state, by full name.
    #[arg(long)]
    state: Option<String>,

    /// Print the resolved plan and exit without any network calls.
    #[arg(long)]
    dry_run: bool,

    /// Run cross-run duplicate detection over the catalog instead of
    /// harvesting.
    #[arg(long)]
    dedup: bool,

    /// With --dedup, merge each detected group into its representative.
    #[arg(long)]
    apply: bool,

    /// Similarity threshold for duplicate grouping.
    #[arg(long, default_value_t = dedup::DEFAULT_THRESHOLD)]
    dedup_threshold: f64,

    #[arg(long, value_enum, default_value = "memory")]
    catalog: CatalogBackend,

    /// Minimum spacing between requests to any one source, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    rate_limit_ms: u64,

    /// Write the run report as JSON to this path.
    #[arg(long)]
    report_json: Option<std::path::PathBuf>,

    /// Write the run report as CSV to this path.
    #[arg(long)]
    report_csv: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_redacted();

    let registry = StateRegistry::load()?;

    let settings = HarvestSettings {
        batch_delay: Duration::from_millis(cli.rate_limit_ms),
        target_override: cli.target_count,
        tier_filter: cli.tier,
        state_filter: cli.state.clone(),
        ..Default::default()
    };

    if cli.dry_run {
        let plan = build_plan(&registry, &settings);
        println!("{}", plan.describe());
        return Ok(());
    }

    let catalog: Arc<dyn CatalogStore> = match cli.catalog {
        CatalogBackend::Memory => Arc::new(MemoryCatalog::new()),
        CatalogBackend::Postgres => {
            let Some(url) = &config.database_url else {
                bail!("--catalog postgres requires DATABASE_URL");
            };
            let pg = PgCatalog::connect(url)
                .await
                .context("connecting to postgres")?;
            pg.migrate().await.context("running migrations")?;
            Arc::new(pg)
        }
    };

    if cli.dedup {
        return run_dedup(catalog, cli.dedup_threshold, cli.apply).await;
    }

    if !config.any_source() {
        bail!(
            "no source credentials configured; set GOOGLE_PLACES_API_KEY, \
             YELP_API_KEY, or DIRECTORY_SEARCH_URL"
        );
    }

    let limiter = Arc::new(RateLimiter::new(Duration::from_millis(cli.rate_limit_ms)));
    let adapters = adapters::adapters_from_config(&config, limiter);
    let monitor = Arc::new(Monitor::new());
    let harvester = Harvester::new(adapters, catalog, settings, monitor.clone())?;

    let report = harvester.run(&registry).await?;
    println!("{}", monitor.snapshot());
    println!("{report}");

    if let Some(path) = &cli.report_json {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Wrote JSON report");
    }
    if let Some(path) = &cli.report_csv {
        std::fs::write(path, report.csv_rows().join("\n") + "\n")
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Wrote CSV report");
    }

    Ok(())
}

/// Offline duplicate pass over the whole catalog.
async fn run_dedup(
    catalog: Arc<dyn CatalogStore>,
    threshold: f64,
    apply: bool,
) -> anyhow::Result<()> {
    let records = catalog.active_records().await?;
    info!(records = records.len(), threshold, "Scanning for duplicates");

    let groups = dedup::find_duplicate_groups(&records, threshold);
    if groups.is_empty() {
        println!("No duplicate groups at threshold {threshold}");
        return Ok(());
    }

    for group in &groups {
        println!(
            "Group (confidence {:.3}), representative {}:",
            group.confidence, group.representative_id
        );
        for member in &group.members {
            println!(
                "  {} [{}] similarity {:.3}",
                member.name, member.id, member.similarity
            );
        }
    }
    println!("{} duplicate group(s) found", groups.len());

    if apply {
        for group in &groups {
            let remove: Vec<_> = group
                .members
                .iter()
                .map(|m| m.id)
                .filter(|id| *id != group.representative_id)
                .collect();
            catalog.merge(group.representative_id, &remove).await?;
            info!(
                keep = %group.representative_id,
                merged = remove.len(),
                "Merged duplicate group"
            );
        }
    }

    Ok(())
}
