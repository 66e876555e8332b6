use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use dashboard_metrics::db::{self, PgRecordStore};
use dashboard_metrics::period::ComparisonPeriod;
use dashboard_metrics::widget::{self, WidgetDefinition};
use dashboard_metrics::{
    aggregate_metrics, aggregate_previous_metrics, format_value, report, MemoryStore,
    MetricsSnapshot, RecordStore, TimeWindow,
};

#[derive(Parser)]
#[command(name = "community-dashboard")]
#[command(about = "Dashboard metrics and custom widget calculations", long_about = None)]
struct Cli {
    /// Read records from a JSON fixture instead of Postgres
    #[arg(long, global = true)]
    records: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the metrics snapshot for the current or previous period
    Snapshot {
        #[arg(long, value_enum, default_value_t = ComparisonPeriod::Monthly)]
        period: ComparisonPeriod,
        #[arg(long)]
        previous: bool,
        #[arg(long)]
        json: bool,
    },
    /// Evaluate active custom widgets against the current and previous period
    Widgets {
        #[arg(long, value_enum, default_value_t = ComparisonPeriod::Monthly)]
        period: ComparisonPeriod,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum, default_value_t = ComparisonPeriod::Monthly)]
        period: ComparisonPeriod,
        #[arg(long)]
        widgets: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the period comparison as CSV
    Export {
        #[arg(long, value_enum, default_value_t = ComparisonPeriod::Monthly)]
        period: ComparisonPeriod,
        #[arg(long)]
        out: PathBuf,
    },
}

enum Backend {
    Postgres(PgRecordStore),
    Fixture(MemoryStore),
}

impl Backend {
    async fn connect(records: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = records {
            let file = File::open(path)
                .with_context(|| format!("failed to open fixture {}", path.display()))?;
            let store = MemoryStore::from_reader(BufReader::new(file))
                .with_context(|| format!("failed to parse fixture {}", path.display()))?;
            log::info!("using record fixture {}", path.display());
            return Ok(Backend::Fixture(store));
        }

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set when --records is not given")?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .context("failed to connect to Postgres")?;

        Ok(Backend::Postgres(PgRecordStore::new(pool)))
    }

    fn store(&self) -> &dyn RecordStore {
        match self {
            Backend::Postgres(store) => store,
            Backend::Fixture(store) => store,
        }
    }

    async fn widgets(&self, file: Option<&Path>) -> anyhow::Result<Vec<WidgetDefinition>> {
        if let Some(path) = file {
            let file = File::open(path)
                .with_context(|| format!("failed to open widgets {}", path.display()))?;
            return widget::load_widgets(BufReader::new(file))
                .with_context(|| format!("failed to parse widgets {}", path.display()));
        }

        match self {
            Backend::Postgres(store) => Ok(widget::active_widgets(
                db::fetch_widgets(store.pool()).await?,
            )),
            Backend::Fixture(_) => Ok(Vec::new()),
        }
    }
}

struct Comparison {
    current_window: TimeWindow,
    previous_window: TimeWindow,
    current: MetricsSnapshot,
    previous: MetricsSnapshot,
}

async fn compare(store: &dyn RecordStore, period: ComparisonPeriod) -> anyhow::Result<Comparison> {
    let now = Utc::now();
    let current_window = period.current_window(now);
    let previous_window = period.previous_window(now);

    let current = aggregate_metrics(store, current_window)
        .await
        .context("failed to aggregate current period")?;
    let previous = aggregate_previous_metrics(store, previous_window)
        .await
        .context("failed to aggregate previous period")?;

    Ok(Comparison {
        current_window,
        previous_window,
        current,
        previous,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let backend = Backend::connect(cli.records.as_deref()).await?;

    match cli.command {
        Commands::Snapshot {
            period,
            previous,
            json,
        } => {
            let now = Utc::now();
            let (window, snapshot) = if previous {
                let window = period.previous_window(now);
                (window, aggregate_previous_metrics(backend.store(), window).await?)
            } else {
                let window = period.current_window(now);
                (window, aggregate_metrics(backend.store(), window).await?)
            };

            if json {
                let metrics: BTreeMap<&str, f64> = snapshot
                    .values()
                    .map(|(key, value)| (key.as_str(), value))
                    .collect();
                let output = serde_json::json!({ "window": window, "metrics": metrics });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            println!("Metrics for {window}:");
            for (key, value) in snapshot.values() {
                println!("- {}: {}", key, format_value(value, key.display_format()));
            }
        }
        Commands::Widgets { period, file, json } => {
            let widgets = backend.widgets(file.as_deref()).await?;
            if widgets.is_empty() {
                println!("No active widgets configured.");
                return Ok(());
            }

            let comparison = compare(backend.store(), period).await?;
            let summaries =
                widget::summarize_all(&widgets, &comparison.current, &comparison.previous);

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            println!("Widgets ({}):", period.label());
            for summary in summaries.iter() {
                println!(
                    "- {}: {} ({}, {})",
                    summary.title,
                    summary.value,
                    summary.change.change,
                    summary.change.change_type.as_str()
                );
            }
        }
        Commands::Report {
            period,
            widgets,
            out,
        } => {
            let definitions = backend.widgets(widgets.as_deref()).await?;
            let comparison = compare(backend.store(), period).await?;
            let summaries =
                widget::summarize_all(&definitions, &comparison.current, &comparison.previous);
            let report = report::build_report(
                period,
                comparison.current_window,
                comparison.previous_window,
                &comparison.current,
                &comparison.previous,
                &summaries,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { period, out } => {
            let comparison = compare(backend.store(), period).await?;
            let file = File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let rows =
                report::write_comparison_csv(file, &comparison.current, &comparison.previous)?;
            println!("Exported {rows} metrics to {}.", out.display());
        }
    }

    Ok(())
}
