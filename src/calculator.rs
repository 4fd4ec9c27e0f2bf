// 🧮 Commission Calculation Engine
//
// rate      = first non-zero value for the tenure key in
//             tenures → monthly_aum_tenures → quarterly_aum_tenures
// total     = amount × rate / 100
// per party = total × share / 100

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entities::scheme::{find_scheme_by_name, RateField, Scheme};
use crate::entities::split::{current_split, CommissionSplit};
use crate::error::{Result, SimulatorError};
use crate::validation::present_text;

/// Request body for `calculate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalculationRequest {
    #[serde(default)]
    pub scheme: Option<String>,

    #[serde(default, rename = "tenureKey")]
    pub tenure_key: Option<String>,

    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionBreakdown {
    pub scheme: String,
    pub tenure_key: String,
    pub amount: f64,
    pub rate: f64,
    pub total_earnings: f64,
    pub operator_earnings: f64,
    pub sub_distributor_earnings: f64,
    pub distributor_earnings: f64,
}

/// Look up the rate for `tenure_key`.
///
/// A stored rate of 0 is skipped exactly like a missing key, so a zero in
/// `tenures` falls through to the AUM maps and a zero everywhere is "not found".
pub fn resolve_rate(scheme: &Scheme, tenure_key: &str) -> Option<f64> {
    RateField::TENURE_SOURCES
        .iter()
        .filter_map(|field| scheme.rate_map(*field))
        .filter_map(|rates| rates.get(tenure_key).copied())
        .find(|rate| *rate != 0.0)
}

/// Pure arithmetic on an already-loaded scheme and split
pub fn compute_breakdown(
    scheme: &Scheme,
    tenure_key: &str,
    amount: f64,
    split: &CommissionSplit,
) -> Result<CommissionBreakdown> {
    let rate = resolve_rate(scheme, tenure_key).ok_or_else(|| {
        SimulatorError::not_found(format!(
            "No matching tenure found for scheme '{}'",
            scheme.name
        ))
    })?;

    let total_earnings = amount * rate / 100.0;
    let party = |share: f64| total_earnings * share / 100.0;

    Ok(CommissionBreakdown {
        scheme: scheme.name.clone(),
        tenure_key: tenure_key.to_string(),
        amount,
        rate,
        total_earnings,
        operator_earnings: party(split.operator_share),
        sub_distributor_earnings: party(split.sub_distributor_share),
        distributor_earnings: party(split.distributor_share),
    })
}

/// Validate the request, load the scheme and current split, compute the payout
pub fn calculate(conn: &Connection, request: &CalculationRequest) -> Result<CommissionBreakdown> {
    let scheme_name = present_text(request.scheme.as_deref());
    // Presence is checked on the trimmed key; lookup uses the label as sent
    let tenure_key = request
        .tenure_key
        .as_deref()
        .filter(|key| present_text(Some(*key)).is_some());
    // amount == 0 counts as missing
    let amount = request.amount.filter(|a| *a != 0.0);

    let (Some(scheme_name), Some(tenure_key), Some(amount)) = (scheme_name, tenure_key, amount)
    else {
        return Err(SimulatorError::invalid(
            "Scheme, tenureKey, and amount are required",
        ));
    };

    if !amount.is_finite() || amount < 0.0 {
        return Err(SimulatorError::invalid("amount must be a positive number"));
    }

    let scheme = find_scheme_by_name(conn, scheme_name)?;
    let split = current_split(conn)?;
    let breakdown = compute_breakdown(&scheme, tenure_key, amount, &split)?;

    info!(
        scheme = %scheme_name,
        tenure_key = %tenure_key,
        total = breakdown.total_earnings,
        "commission calculated"
    );
    Ok(breakdown)
}
