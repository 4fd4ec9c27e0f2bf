use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::error::Result;

/// Open (or create) the simulator database and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Schemes Table (rate maps stored as JSON text)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schemes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scheme_uuid TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            gst_mode TEXT NOT NULL,
            payout_mode TEXT,
            tenures TEXT,
            monthly_aum_tenures TEXT,
            quarterly_aum_tenures TEXT,
            volume_incentives TEXT,
            trail_income TEXT,
            brokerage_rates TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Distributors Table (MFDs)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS distributors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            distributor_uuid TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            unique_id TEXT UNIQUE NOT NULL,
            commission_share REAL NOT NULL CHECK (commission_share >= 0 AND commission_share <= 100),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Commission Split (single row, id pinned to 1)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS commission_split (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            operator_share REAL NOT NULL,
            sub_distributor_share REAL NOT NULL,
            distributor_share REAL NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// True when a write failed on a UNIQUE constraint
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Row count of one of the simulator's own tables
pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;

    Ok(count)
}

// ============================================================================
// Column codecs
// ============================================================================

pub(crate) fn encode_json<T: Serialize>(value: Option<&T>) -> Result<Option<String>> {
    Ok(value.map(serde_json::to_string).transpose()?)
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|json_str| {
        serde_json::from_str(&json_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn time_column(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
