// Brokerage Commission Simulator - Web Server

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use brokerage_simulator::api::{router, AppState};
use brokerage_simulator::{bootstrap, init_logging, open_database, SeedSource, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_filter);

    println!("🌐 Brokerage Commission Simulator - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = &config.storage.database_path;
    let conn = open_database(db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    println!("✓ Database opened: {:?}", db_path);

    // No requests are served until the split row exists
    let report = match bootstrap(&conn, config.storage.legacy_database_path.as_deref()) {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "failed to set up database");
            return Err(e).context("startup migration failed");
        }
    };
    if report.source != SeedSource::Existing {
        println!("✓ Commission split seeded ({:?})", report.source);
    }

    let app = router(AppState::new(conn));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!(address = %addr, "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   Admin:     http://{}/admin", addr);
    println!("   Simulator: http://{}/simulator", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
