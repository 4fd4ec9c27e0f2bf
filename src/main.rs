// Admin CLI: bootstrap the database, import scheme documents, inspect and
// try out calculations without running the HTTP server.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};

use brokerage_simulator::db::count_rows;
use brokerage_simulator::entities::scheme::{create_scheme, list_schemes};
use brokerage_simulator::{
    bootstrap, calculate, init_logging, open_database, CalculationRequest, NewScheme, SeedSource,
    SimulatorError, StorageConfig,
};

#[derive(Debug, Parser)]
#[command(name = "brokerage-simulator", version, about = "Brokerage commission admin CLI")]
struct Cli {
    #[command(flatten)]
    storage: StorageConfig,

    #[arg(long, env = "LOG_FILTER", default_value = "warn")]
    log_filter: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create tables and seed the commission split
    Init,
    /// Create schemes from a JSON array of scheme documents
    Import { file: PathBuf },
    /// List registered schemes
    Schemes,
    /// Compute a commission breakdown
    Calculate {
        #[arg(long)]
        scheme: String,
        #[arg(long)]
        tenure: String,
        #[arg(long)]
        amount: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_filter);

    let conn = open_database(&cli.storage.database_path).with_context(|| {
        format!(
            "failed to open database {}",
            cli.storage.database_path.display()
        )
    })?;

    match cli.command {
        Command::Init => run_init(&conn, cli.storage.legacy_database_path.as_deref()),
        Command::Import { file } => run_import(&conn, &file),
        Command::Schemes => run_schemes(&conn),
        Command::Calculate {
            scheme,
            tenure,
            amount,
        } => run_calculate(&conn, scheme, tenure, amount),
    }
}

fn run_init(conn: &Connection, legacy_path: Option<&Path>) -> Result<()> {
    println!("🔧 Setting up database...");
    let report = bootstrap(conn, legacy_path).context("bootstrap failed")?;

    let origin = match report.source {
        SeedSource::Existing => "already stored",
        SeedSource::Legacy => "seeded from legacy commission_sharing table",
        SeedSource::Default => "seeded with defaults",
    };
    let [operator, sub_distributor, distributor] = report.split.shares();

    println!("✓ Database initialized with WAL mode");
    println!(
        "✓ Commission split {}: redVision {}% / fixerra {}% / mfd {}%",
        origin, operator, sub_distributor, distributor
    );
    println!(
        "✓ Database contains {} schemes and {} MFDs",
        count_rows(conn, "schemes")?,
        count_rows(conn, "distributors")?
    );
    Ok(())
}

fn run_import(conn: &Connection, file: &Path) -> Result<()> {
    println!("📂 Loading {}...", file.display());
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let documents: Value = serde_json::from_str(&raw).context("file is not valid JSON")?;
    let Some(documents) = documents.as_array() else {
        bail!("expected a JSON array of scheme documents");
    };

    bootstrap(conn, None).context("bootstrap failed")?;

    let mut created = 0usize;
    let mut duplicates = 0usize;
    for (index, document) in documents.iter().enumerate() {
        let new_scheme = NewScheme::from_json(document)
            .with_context(|| format!("scheme document #{} is invalid", index + 1))?;

        match create_scheme(conn, new_scheme) {
            Ok(scheme) => {
                created += 1;
                println!("  + {}", scheme.name);
            }
            Err(SimulatorError::Conflict(message)) => {
                duplicates += 1;
                println!("  = {} (skipped)", message);
            }
            Err(e) => return Err(e).context("import aborted"),
        }
    }

    println!("\n✓ Created {} schemes", created);
    println!("✓ Duplicates skipped: {}", duplicates);
    Ok(())
}

fn run_schemes(conn: &Connection) -> Result<()> {
    let schemes = list_schemes(conn)?;
    if schemes.is_empty() {
        println!("No schemes registered");
        return Ok(());
    }

    for scheme in &schemes {
        let payout = scheme.payout_mode.map(|p| p.as_str()).unwrap_or("-");
        println!("{:<32} gst={:<10} payout={}", scheme.name, scheme.gst_mode.as_str(), payout);
    }
    println!("\n✓ {} schemes", schemes.len());
    Ok(())
}

fn run_calculate(conn: &Connection, scheme: String, tenure: String, amount: f64) -> Result<()> {
    bootstrap(conn, None).context("bootstrap failed")?;

    let request = CalculationRequest {
        scheme: Some(scheme),
        tenure_key: Some(tenure),
        amount: Some(amount),
    };
    let breakdown = calculate(conn, &request)?;

    println!("🧮 {} @ {} ({}%)", breakdown.scheme, breakdown.tenure_key, breakdown.rate);
    println!("   Amount:          {:>14.2}", breakdown.amount);
    println!("   Total earnings:  {:>14.2}", breakdown.total_earnings);
    println!("   redVision:       {:>14.2}", breakdown.operator_earnings);
    println!("   fixerra:         {:>14.2}", breakdown.sub_distributor_earnings);
    println!("   mfd:             {:>14.2}", breakdown.distributor_earnings);
    Ok(())
}
