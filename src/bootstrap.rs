// 🚀 Startup migration
//
// Runs once per process start (and from `brokerage-simulator init`):
//   1. create tables if missing
//   2. if no split row exists, seed one, preferring the legacy
//      `commission_sharing` table when a legacy database is configured
// Running it again is a no-op.

use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::{info, warn};

use crate::db::setup_database;
use crate::entities::split::{ensure_split, stored_split, CommissionSplit};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// A split row was already stored; nothing written
    Existing,
    /// Seeded from the legacy `commission_sharing` table
    Legacy,
    /// Seeded with 20/20/60
    Default,
}

#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub source: SeedSource,
    pub split: CommissionSplit,
}

pub fn bootstrap(conn: &Connection, legacy_path: Option<&Path>) -> Result<BootstrapReport> {
    setup_database(conn)?;

    if let Some(split) = stored_split(conn)? {
        info!("commission sharing settings already exist");
        return Ok(BootstrapReport {
            source: SeedSource::Existing,
            split,
        });
    }

    let legacy = match legacy_path {
        Some(path) => read_legacy_split(path)?,
        None => None,
    };
    let (source, seed) = match legacy {
        Some(split) => (SeedSource::Legacy, split),
        None => (SeedSource::Default, CommissionSplit::default()),
    };

    ensure_split(conn, &seed)?;
    let split = stored_split(conn)?.unwrap_or(seed);

    info!(source = ?source, "default commission sharing values inserted");
    Ok(BootstrapReport { source, split })
}

/// Read row `id = 1` of the legacy `commission_sharing` table.
///
/// Missing file, missing table, missing row, a NULL share, or shares that do
/// not add up to 100 all yield `None`.
pub fn read_legacy_split(path: &Path) -> Result<Option<CommissionSplit>> {
    if !path.exists() {
        warn!(path = %path.display(), "legacy database not found, using defaults");
        return Ok(None);
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let has_table: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'commission_sharing')",
        [],
        |row| row.get(0),
    )?;
    if !has_table {
        return Ok(None);
    }

    let row = conn
        .query_row(
            "SELECT redVision, fixerra, mfd FROM commission_sharing WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some(shares) = row else {
        return Ok(None);
    };
    let (Some(operator), Some(sub_distributor), Some(distributor)) = shares else {
        warn!("ignoring legacy commission split with a NULL share");
        return Ok(None);
    };

    match CommissionSplit::new(operator, sub_distributor, distributor) {
        Ok(split) => Ok(Some(split)),
        Err(e) => {
            warn!(error = %e, "ignoring invalid legacy commission split");
            Ok(None)
        }
    }
}
