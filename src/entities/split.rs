// ⚖️ Commission Split - global three-way division of computed commission
//
// Stored as one row pinned to id = 1. Writes are an upsert, reads fall back
// to the 20/20/60 default when nothing has been stored yet.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SimulatorError};
use crate::validation::{validate_percentage, validate_share_sum};

pub const DEFAULT_OPERATOR_SHARE: f64 = 20.0;
pub const DEFAULT_SUB_DISTRIBUTOR_SHARE: f64 = 20.0;
pub const DEFAULT_DISTRIBUTOR_SHARE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Platform operator
    #[serde(rename = "redVision")]
    pub operator_share: f64,

    /// Sub-distributor
    #[serde(rename = "fixerra")]
    pub sub_distributor_share: f64,

    /// Mutual-fund distributor
    #[serde(rename = "mfd")]
    pub distributor_share: f64,

    /// `None` for the built-in default that was never persisted
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for CommissionSplit {
    fn default() -> Self {
        CommissionSplit {
            operator_share: DEFAULT_OPERATOR_SHARE,
            sub_distributor_share: DEFAULT_SUB_DISTRIBUTOR_SHARE,
            distributor_share: DEFAULT_DISTRIBUTOR_SHARE,
            updated_at: None,
        }
    }
}

impl CommissionSplit {
    /// Build a validated split: each share in [0, 100], total exactly 100
    pub fn new(operator: f64, sub_distributor: f64, distributor: f64) -> Result<Self> {
        validate_percentage("redVision", operator)?;
        validate_percentage("fixerra", sub_distributor)?;
        validate_percentage("mfd", distributor)?;
        validate_share_sum([operator, sub_distributor, distributor])?;

        Ok(CommissionSplit {
            operator_share: operator,
            sub_distributor_share: sub_distributor,
            distributor_share: distributor,
            updated_at: None,
        })
    }

    pub fn shares(&self) -> [f64; 3] {
        [
            self.operator_share,
            self.sub_distributor_share,
            self.distributor_share,
        ]
    }
}

/// Request body for `add-commission`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SplitInput {
    #[serde(default, rename = "redVision")]
    pub operator_share: Option<f64>,

    #[serde(default, rename = "fixerra")]
    pub sub_distributor_share: Option<f64>,

    #[serde(default, rename = "mfd")]
    pub distributor_share: Option<f64>,
}

impl SplitInput {
    pub fn to_split(&self) -> Result<CommissionSplit> {
        match (
            self.operator_share,
            self.sub_distributor_share,
            self.distributor_share,
        ) {
            (Some(operator), Some(sub_distributor), Some(distributor)) => {
                CommissionSplit::new(operator, sub_distributor, distributor)
            }
            _ => Err(SimulatorError::invalid("Total percentage must equal 100%")),
        }
    }
}

/// Overwrite the split row with a validated input
pub fn add_or_replace_split(conn: &Connection, input: &SplitInput) -> Result<CommissionSplit> {
    let mut split = input.to_split()?;
    let now = Utc::now();

    conn.execute(
        "INSERT INTO commission_split (id, operator_share, sub_distributor_share, distributor_share, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
            operator_share = excluded.operator_share,
            sub_distributor_share = excluded.sub_distributor_share,
            distributor_share = excluded.distributor_share,
            updated_at = excluded.updated_at",
        params![
            split.operator_share,
            split.sub_distributor_share,
            split.distributor_share,
            now.to_rfc3339(),
        ],
    )?;

    split.updated_at = Some(now);
    info!(
        red_vision = split.operator_share,
        fixerra = split.sub_distributor_share,
        mfd = split.distributor_share,
        "commission split replaced"
    );
    Ok(split)
}

/// The stored split row, if any
pub fn stored_split(conn: &Connection) -> Result<Option<CommissionSplit>> {
    let split = conn
        .query_row(
            "SELECT operator_share, sub_distributor_share, distributor_share, updated_at
             FROM commission_split WHERE id = 1",
            [],
            |row| {
                Ok(CommissionSplit {
                    operator_share: row.get(0)?,
                    sub_distributor_share: row.get(1)?,
                    distributor_share: row.get(2)?,
                    updated_at: Some(crate::db::time_column(row, 3)?),
                })
            },
        )
        .optional()?;

    Ok(split)
}

/// The split in force: the stored row or the bootstrap default
pub fn current_split(conn: &Connection) -> Result<CommissionSplit> {
    Ok(stored_split(conn)?.unwrap_or_default())
}

/// Insert `seed` only when no split row exists yet. Returns true if inserted.
pub fn ensure_split(conn: &Connection, seed: &CommissionSplit) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO commission_split (id, operator_share, sub_distributor_share, distributor_share, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4)",
        params![
            seed.operator_share,
            seed.sub_distributor_share,
            seed.distributor_share,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(inserted > 0)
}
