// 🤝 Distributor Entity - mutual-fund distributors (MFDs)
//
// Identity is `uniqueId`. Re-submitting a known uniqueId only moves its
// commission share; name and identity stay put.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{is_unique_violation, time_column};
use crate::error::{Result, SimulatorError};
use crate::validation::{present_text, validate_percentage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distributor {
    pub id: String,

    pub name: String,

    #[serde(rename = "uniqueId")]
    pub unique_id: String,

    #[serde(rename = "commissionShare")]
    pub commission_share: f64,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Request body for the upsert; every field may be missing on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistributorInput {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "uniqueId")]
    pub unique_id: Option<String>,

    #[serde(default, rename = "commissionShare")]
    pub commission_share: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

const DISTRIBUTOR_COLUMNS: &str =
    "distributor_uuid, name, unique_id, commission_share, created_at, updated_at";

fn distributor_from_row(row: &Row) -> rusqlite::Result<Distributor> {
    Ok(Distributor {
        id: row.get(0)?,
        name: row.get(1)?,
        unique_id: row.get(2)?,
        commission_share: row.get(3)?,
        created_at: time_column(row, 4)?,
        updated_at: time_column(row, 5)?,
    })
}

/// Create a distributor, or update the share of the one holding `uniqueId`
pub fn upsert_distributor(
    conn: &Connection,
    input: &DistributorInput,
) -> Result<(Distributor, UpsertOutcome)> {
    let (Some(name), Some(unique_id), Some(share)) = (
        present_text(input.name.as_deref()),
        present_text(input.unique_id.as_deref()),
        input.commission_share,
    ) else {
        return Err(SimulatorError::invalid(
            "Name, uniqueId, and commissionShare are required",
        ));
    };
    let share = validate_percentage("commissionShare", share)?;
    let now = Utc::now();

    let tx = conn.unchecked_transaction()?;

    let existing = tx
        .query_row(
            &format!(
                "SELECT {} FROM distributors WHERE unique_id = ?1",
                DISTRIBUTOR_COLUMNS
            ),
            params![unique_id],
            distributor_from_row,
        )
        .optional()?;

    let outcome = match existing {
        Some(mut distributor) => {
            tx.execute(
                "UPDATE distributors SET commission_share = ?1, updated_at = ?2 WHERE unique_id = ?3",
                params![share, now.to_rfc3339(), unique_id],
            )?;
            distributor.commission_share = share;
            distributor.updated_at = now;
            (distributor, UpsertOutcome::Updated)
        }
        None => {
            let distributor = Distributor {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.to_string(),
                unique_id: unique_id.to_string(),
                commission_share: share,
                created_at: now,
                updated_at: now,
            };

            let result = tx.execute(
                &format!(
                    "INSERT INTO distributors ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    DISTRIBUTOR_COLUMNS
                ),
                params![
                    distributor.id,
                    distributor.name,
                    distributor.unique_id,
                    distributor.commission_share,
                    distributor.created_at.to_rfc3339(),
                    distributor.updated_at.to_rfc3339(),
                ],
            );

            match result {
                Ok(_) => (distributor, UpsertOutcome::Created),
                Err(e) if is_unique_violation(&e) => {
                    return Err(SimulatorError::conflict(format!(
                        "MFD '{}' already exists",
                        name
                    )))
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    tx.commit()?;
    info!(unique_id = %unique_id, outcome = ?outcome.1, "MFD saved");
    Ok(outcome)
}

/// All distributors in insertion order
pub fn list_distributors(conn: &Connection) -> Result<Vec<Distributor>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM distributors ORDER BY id ASC",
        DISTRIBUTOR_COLUMNS
    ))?;

    let distributors = stmt
        .query_map([], distributor_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(distributors)
}
