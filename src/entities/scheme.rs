// 📈 Scheme Entity - commission-bearing financial product
//
// Identity is the scheme name (unique). Rates live in six label → percentage
// maps; the first three are tenure maps used by the calculator.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::db::{encode_json, is_unique_violation, json_column, time_column};
use crate::error::{Result, SimulatorError};
use crate::validation::{required_text, validate_rate_map};

/// Label → percentage
pub type RateMap = BTreeMap<String, f64>;

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GstMode {
    Exclusive,
    Inclusive,
}

impl GstMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GstMode::Exclusive => "exclusive",
            GstMode::Inclusive => "inclusive",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "exclusive" => Ok(GstMode::Exclusive),
            "inclusive" => Ok(GstMode::Inclusive),
            other => Err(SimulatorError::invalid(format!(
                "Invalid gst '{}': expected 'exclusive' or 'inclusive'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutMode {
    #[serde(rename = "one-time upfront", alias = "one-time-upfront")]
    OneTimeUpfront,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "quarterly")]
    Quarterly,
}

impl PayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMode::OneTimeUpfront => "one-time upfront",
            PayoutMode::Monthly => "monthly",
            PayoutMode::Quarterly => "quarterly",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "one-time upfront" | "one-time-upfront" => Ok(PayoutMode::OneTimeUpfront),
            "monthly" => Ok(PayoutMode::Monthly),
            "quarterly" => Ok(PayoutMode::Quarterly),
            other => Err(SimulatorError::invalid(format!(
                "Invalid payout '{}': expected 'one-time upfront', 'monthly' or 'quarterly'",
                other
            ))),
        }
    }
}

/// The six rate maps a scheme can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateField {
    Tenures,
    MonthlyAumTenures,
    QuarterlyAumTenures,
    VolumeIncentives,
    TrailIncome,
    BrokerageRates,
}

impl RateField {
    pub const ALL: [RateField; 6] = [
        RateField::Tenures,
        RateField::MonthlyAumTenures,
        RateField::QuarterlyAumTenures,
        RateField::VolumeIncentives,
        RateField::TrailIncome,
        RateField::BrokerageRates,
    ];

    /// Tenure maps in calculator probing order
    pub const TENURE_SOURCES: [RateField; 3] = [
        RateField::Tenures,
        RateField::MonthlyAumTenures,
        RateField::QuarterlyAumTenures,
    ];

    /// JSON key and column name
    pub fn key(&self) -> &'static str {
        match self {
            RateField::Tenures => "tenures",
            RateField::MonthlyAumTenures => "monthly_aum_tenures",
            RateField::QuarterlyAumTenures => "quarterly_aum_tenures",
            RateField::VolumeIncentives => "volume_incentives",
            RateField::TrailIncome => "trail_income",
            RateField::BrokerageRates => "brokerage_rates",
        }
    }
}

// ============================================================================
// SCHEME ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scheme {
    pub id: String,

    #[serde(rename = "scheme")]
    pub name: String,

    #[serde(rename = "gst")]
    pub gst_mode: GstMode,

    #[serde(rename = "payout", default, skip_serializing_if = "Option::is_none")]
    pub payout_mode: Option<PayoutMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenures: Option<RateMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_aum_tenures: Option<RateMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly_aum_tenures: Option<RateMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_incentives: Option<RateMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trail_income: Option<RateMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brokerage_rates: Option<RateMap>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Scheme {
    pub fn rate_map(&self, field: RateField) -> Option<&RateMap> {
        match field {
            RateField::Tenures => self.tenures.as_ref(),
            RateField::MonthlyAumTenures => self.monthly_aum_tenures.as_ref(),
            RateField::QuarterlyAumTenures => self.quarterly_aum_tenures.as_ref(),
            RateField::VolumeIncentives => self.volume_incentives.as_ref(),
            RateField::TrailIncome => self.trail_income.as_ref(),
            RateField::BrokerageRates => self.brokerage_rates.as_ref(),
        }
    }

    pub fn set_rate_map(&mut self, field: RateField, rates: Option<RateMap>) {
        let slot = match field {
            RateField::Tenures => &mut self.tenures,
            RateField::MonthlyAumTenures => &mut self.monthly_aum_tenures,
            RateField::QuarterlyAumTenures => &mut self.quarterly_aum_tenures,
            RateField::VolumeIncentives => &mut self.volume_incentives,
            RateField::TrailIncome => &mut self.trail_income,
            RateField::BrokerageRates => &mut self.brokerage_rates,
        };
        *slot = rates;
    }
}

// ============================================================================
// INPUTS
// ============================================================================

/// Validated payload for a new scheme
#[derive(Debug, Clone)]
pub struct NewScheme {
    pub name: String,
    pub gst_mode: GstMode,
    pub payout_mode: Option<PayoutMode>,
    pub rate_maps: Vec<(RateField, RateMap)>,
}

impl NewScheme {
    /// Parse and validate a scheme document (`{scheme, gst, payout, tenures, ...}`)
    pub fn from_json(body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| SimulatorError::invalid("Request body must be a JSON object"))?;

        let (Some(name), Some(gst)) = (required_text(object, "scheme"), required_text(object, "gst"))
        else {
            return Err(SimulatorError::invalid("Scheme and GST are required"));
        };

        let gst_mode = GstMode::parse(&gst)?;
        let payout_mode = parse_optional_payout(object.get("payout"))?;

        let mut rate_maps = Vec::new();
        for field in RateField::ALL {
            if let Some(rates) = validate_rate_map(field.key(), object.get(field.key()))? {
                rate_maps.push((field, rates));
            }
        }

        Ok(NewScheme {
            name,
            gst_mode,
            payout_mode,
            rate_maps,
        })
    }

    fn into_scheme(self) -> Scheme {
        let now = Utc::now();
        let mut scheme = Scheme {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name,
            gst_mode: self.gst_mode,
            payout_mode: self.payout_mode,
            tenures: None,
            monthly_aum_tenures: None,
            quarterly_aum_tenures: None,
            volume_incentives: None,
            trail_income: None,
            brokerage_rates: None,
            created_at: now,
            updated_at: now,
        };
        for (field, rates) in self.rate_maps {
            scheme.set_rate_map(field, Some(rates));
        }
        scheme
    }
}

/// Partial update: only the fields present in the request body are touched.
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct SchemeUpdate {
    pub name: Option<String>,
    pub gst_mode: Option<GstMode>,
    pub payout_mode: Option<Option<PayoutMode>>,
    pub rate_maps: Vec<(RateField, Option<RateMap>)>,
}

impl SchemeUpdate {
    pub fn from_json(body: &Value) -> Result<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| SimulatorError::invalid("Request body must be a JSON object"))?;

        let mut update = SchemeUpdate::default();

        if object.contains_key("scheme") {
            let name = required_text(object, "scheme")
                .ok_or_else(|| SimulatorError::invalid("Scheme name cannot be empty"))?;
            update.name = Some(name);
        }

        if object.contains_key("gst") {
            let gst = required_text(object, "gst")
                .ok_or_else(|| SimulatorError::invalid("GST cannot be empty"))?;
            update.gst_mode = Some(GstMode::parse(&gst)?);
        }

        if let Some(payout) = object.get("payout") {
            update.payout_mode = Some(parse_optional_payout(Some(payout))?);
        }

        for field in RateField::ALL {
            if let Some(value) = object.get(field.key()) {
                update
                    .rate_maps
                    .push((field, validate_rate_map(field.key(), Some(value))?));
            }
        }

        Ok(update)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gst_mode.is_none()
            && self.payout_mode.is_none()
            && self.rate_maps.is_empty()
    }

    pub fn apply_to(self, scheme: &mut Scheme) {
        if let Some(name) = self.name {
            scheme.name = name;
        }
        if let Some(gst_mode) = self.gst_mode {
            scheme.gst_mode = gst_mode;
        }
        if let Some(payout_mode) = self.payout_mode {
            scheme.payout_mode = payout_mode;
        }
        for (field, rates) in self.rate_maps {
            scheme.set_rate_map(field, rates);
        }
        scheme.updated_at = Utc::now();
    }
}

fn parse_optional_payout(value: Option<&Value>) -> Result<Option<PayoutMode>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => PayoutMode::parse(s).map(Some),
        Some(_) => Err(SimulatorError::invalid("Invalid data for field: payout")),
    }
}

// ============================================================================
// REPOSITORY
// ============================================================================

const SCHEME_COLUMNS: &str = "scheme_uuid, name, gst_mode, payout_mode,
    tenures, monthly_aum_tenures, quarterly_aum_tenures,
    volume_incentives, trail_income, brokerage_rates,
    created_at, updated_at";

fn scheme_from_row(row: &Row) -> rusqlite::Result<Scheme> {
    let gst_raw: String = row.get(2)?;
    let gst_mode = GstMode::parse(&gst_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let payout_raw: Option<String> = row.get(3)?;
    let payout_mode = payout_raw
        .map(|p| PayoutMode::parse(&p))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Scheme {
        id: row.get(0)?,
        name: row.get(1)?,
        gst_mode,
        payout_mode,
        tenures: json_column(row, 4)?,
        monthly_aum_tenures: json_column(row, 5)?,
        quarterly_aum_tenures: json_column(row, 6)?,
        volume_incentives: json_column(row, 7)?,
        trail_income: json_column(row, 8)?,
        brokerage_rates: json_column(row, 9)?,
        created_at: time_column(row, 10)?,
        updated_at: time_column(row, 11)?,
    })
}

/// Persist a new scheme. Fails with `Conflict` when the name is taken.
pub fn create_scheme(conn: &Connection, new_scheme: NewScheme) -> Result<Scheme> {
    if lookup_scheme(conn, &new_scheme.name)?.is_some() {
        return Err(SimulatorError::conflict(format!(
            "Scheme '{}' already exists",
            new_scheme.name
        )));
    }

    let scheme = new_scheme.into_scheme();
    insert_scheme(conn, &scheme)?;

    info!(scheme = %scheme.name, "brokerage data added");
    Ok(scheme)
}

/// INSERT half of [`create_scheme`]. The UNIQUE index on `name` decides
/// between writers that both passed the lookup.
fn insert_scheme(conn: &Connection, scheme: &Scheme) -> Result<()> {
    let result = conn.execute(
        &format!(
            "INSERT INTO schemes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            SCHEME_COLUMNS
        ),
        params![
            scheme.id,
            scheme.name,
            scheme.gst_mode.as_str(),
            scheme.payout_mode.map(|p| p.as_str()),
            encode_json(scheme.tenures.as_ref())?,
            encode_json(scheme.monthly_aum_tenures.as_ref())?,
            encode_json(scheme.quarterly_aum_tenures.as_ref())?,
            encode_json(scheme.volume_incentives.as_ref())?,
            encode_json(scheme.trail_income.as_ref())?,
            encode_json(scheme.brokerage_rates.as_ref())?,
            scheme.created_at.to_rfc3339(),
            scheme.updated_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(SimulatorError::conflict(format!(
            "Scheme '{}' already exists",
            scheme.name
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Scheme by name, `None` when absent
pub fn lookup_scheme(conn: &Connection, name: &str) -> Result<Option<Scheme>> {
    let scheme = conn
        .query_row(
            &format!("SELECT {} FROM schemes WHERE name = ?1", SCHEME_COLUMNS),
            params![name],
            scheme_from_row,
        )
        .optional()?;

    Ok(scheme)
}

/// Scheme by name, `NotFound` when absent
pub fn find_scheme_by_name(conn: &Connection, name: &str) -> Result<Scheme> {
    lookup_scheme(conn, name)?
        .ok_or_else(|| SimulatorError::not_found(format!("Scheme '{}' not found", name)))
}

/// All schemes in insertion order
pub fn list_schemes(conn: &Connection) -> Result<Vec<Scheme>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM schemes ORDER BY id ASC",
        SCHEME_COLUMNS
    ))?;

    let schemes = stmt
        .query_map([], scheme_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(count = schemes.len(), "fetched all brokerage data");
    Ok(schemes)
}

/// Replace only the provided top-level fields of an existing scheme
pub fn update_scheme(conn: &Connection, name: &str, update: SchemeUpdate) -> Result<Scheme> {
    let tx = conn.unchecked_transaction()?;

    let mut scheme = find_scheme_by_name(&tx, name)?;
    if update.is_empty() {
        debug!(scheme = %name, "no known fields in update, nothing written");
        return Ok(scheme);
    }
    update.apply_to(&mut scheme);

    let result = tx.execute(
        "UPDATE schemes SET
            name = ?1, gst_mode = ?2, payout_mode = ?3,
            tenures = ?4, monthly_aum_tenures = ?5, quarterly_aum_tenures = ?6,
            volume_incentives = ?7, trail_income = ?8, brokerage_rates = ?9,
            updated_at = ?10
         WHERE scheme_uuid = ?11",
        params![
            scheme.name,
            scheme.gst_mode.as_str(),
            scheme.payout_mode.map(|p| p.as_str()),
            encode_json(scheme.tenures.as_ref())?,
            encode_json(scheme.monthly_aum_tenures.as_ref())?,
            encode_json(scheme.quarterly_aum_tenures.as_ref())?,
            encode_json(scheme.volume_incentives.as_ref())?,
            encode_json(scheme.trail_income.as_ref())?,
            encode_json(scheme.brokerage_rates.as_ref())?,
            scheme.updated_at.to_rfc3339(),
            scheme.id,
        ],
    );

    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(SimulatorError::conflict(format!(
                "Scheme '{}' already exists",
                scheme.name
            )))
        }
        Err(e) => return Err(e.into()),
    }

    tx.commit()?;
    info!(scheme = %name, "brokerage data updated");
    Ok(scheme)
}

// ============================================================================
// TESTS
// ============================================================================
