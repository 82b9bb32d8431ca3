use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scamwatch_data::config::{CallerConfig, DatabaseConfig};
use scamwatch_data::dashboard::{self, DEFAULT_DAILY_WINDOW};
use scamwatch_data::models::LogLevel;
use scamwatch_data::session::{Session, StaticIdentity};
use scamwatch_data::store::postgres::PgStore;
use scamwatch_data::{db, import, report};

#[derive(Parser)]
#[command(name = "scamwatch")]
#[command(about = "Scam watch dashboard data tools", long_about = None)]
struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    caller: CallerConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print headline dashboard counts
    Stats,
    /// Print scam counts per scam type
    Types,
    /// Print scam detections per day
    Daily {
        #[arg(long, default_value_t = DEFAULT_DAILY_WINDOW)]
        days: u32,
    },
    /// Load demo data for the caller
    Seed,
    /// Import messages from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown dashboard report
    Report {
        #[arg(long, default_value_t = DEFAULT_DAILY_WINDOW)]
        days: u32,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let store = PgStore::connect(&cli.database)
        .await
        .context("failed to connect to Postgres")?;
    let identity = StaticIdentity(cli.caller.caller());
    let session = Session::resolve(&store, &identity).await?;
    info!(caller = ?session.caller(), "session ready");

    match cli.command {
        Commands::Stats => {
            let stats = dashboard::get_stats(&session).await?;
            println!("Messages analysed:      {}", stats.total_messages);
            println!("Scams detected:         {}", stats.scams_detected);
            println!("Active conversations:   {}", stats.active_conversations);
            println!("Intelligence gathered:  {}", stats.intelligence_gathered);
        }
        Commands::Types => {
            let distribution = dashboard::get_scam_type_distribution(&session).await?;
            if distribution.is_empty() {
                println!("No scam types recorded.");
                return Ok(());
            }
            for bucket in distribution {
                println!("- {}: {}", bucket.scam_type, bucket.count);
            }
        }
        Commands::Daily { days } => {
            for bucket in dashboard::get_daily_detections(&session, days).await? {
                println!("{}  {}", bucket.date, bucket.count);
            }
        }
        Commands::Seed => {
            if import::seed(&session).await? {
                let _ =
                    db::write_system_log(&session, LogLevel::Info, "demo data seeded", None).await;
                println!("Seed data inserted.");
            } else {
                println!("Caller already has data; nothing seeded.");
            }
        }
        Commands::Import { csv } => {
            let inserted = import::import_csv(&session, &csv).await?;
            let _ = db::write_system_log(
                &session,
                LogLevel::Info,
                "messages imported",
                Some(serde_json::json!({ "count": inserted })),
            )
            .await;
            println!("Inserted {inserted} messages from {}.", csv.display());
        }
        Commands::Report { days, out } => {
            let stats = dashboard::get_stats(&session).await?;
            let distribution = dashboard::get_scam_type_distribution(&session).await?;
            let daily = dashboard::get_daily_detections(&session, days).await?;
            let report = report::build_dashboard_report(
                &stats,
                &distribution,
                &daily,
                Utc::now().date_naive(),
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
