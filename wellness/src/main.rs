//! Store diagnostics for the wellness tracker.
//!
//! Opens the store (running the schema migration gate), runs the health
//! check and prints the report. Exits with status 1 when the store cannot be
//! opened or is unhealthy.
//!
//! ```bash
//! cargo run -p wellness -- --data-dir /tmp/wellness --json
//! ```

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wellness_core::{HealthReport, StoreConfig, StoreError, Tracker, WellnessStore};

/// Parsed command line.
#[derive(Debug, Default)]
struct Args {
    data_dir: Option<PathBuf>,
    json: bool,
    help: bool,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--data-dir" | "-d" => {
                let dir = iter.next().context("--data-dir requires a path")?;
                parsed.data_dir = Some(PathBuf::from(dir));
            }
            "--json" => parsed.json = true,
            "--help" | "-h" => parsed.help = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(parsed)
}

fn print_help() {
    println!("wellness - check a wellness tracker store");
    println!();
    println!("USAGE:");
    println!("    wellness [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -d, --data-dir <PATH>  Store directory (default: $WELLNESS_DATA_DIR or the platform data dir)");
    println!("        --json             Print the health report as JSON");
    println!("    -h, --help             Show this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    WELLNESS_DATA_DIR, WELLNESS_MOOD_RETENTION,");
    println!("    WELLNESS_YOUNG_THRESHOLD, WELLNESS_ADULT_THRESHOLD, RUST_LOG");
}

fn print_report(store: &WellnessStore, report: &HealthReport) {
    println!("Store:   {}", store.location());
    println!("Checked: {}", report.checked_at.to_rfc3339());
    if report.healthy {
        println!("Status:  healthy");
    } else {
        println!("Status:  UNHEALTHY ({} issues)", report.issues.len());
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
}

async fn print_users(tracker: &Tracker) -> anyhow::Result<()> {
    let users = tracker.store().users().await;
    println!("Users:   {}", users.len());
    for user in users {
        let progress = tracker.progress_report(user.id()).await?;
        println!(
            "  {} ({}): {} XP, {}, {} day streak",
            user.preferred_name(),
            user.id(),
            progress.experience_points,
            progress.level.name(),
            progress.consecutive_days
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wellness=info,wellness_core=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;
    if args.help {
        print_help();
        return Ok(());
    }

    let mut config = StoreConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }

    let store = match WellnessStore::open_file(&config).await {
        Ok(store) => Arc::new(store),
        Err(StoreError::Migration(e)) => {
            error!(error = %e, "store schema is not compatible with this build");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open store at {}", config.store_path().display()));
        }
    };

    let report = store.health_check().await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&store, &report);
        print_users(&Tracker::new(store.clone())).await?;
    }

    if !report.healthy {
        std::process::exit(1);
    }
    Ok(())
}
