// Tenure lookup for a single scheme: the three tenure maps merged into one,
// plus the scheme-level fields a calculator form needs.

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::entities::scheme::{find_scheme_by_name, GstMode, PayoutMode, RateField, RateMap, Scheme};
use crate::error::{Result, SimulatorError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemeTenures {
    pub scheme: String,
    pub gst: GstMode,
    pub payout: Option<PayoutMode>,
    pub tenures: RateMap,
    pub volume_incentives: RateMap,
    pub trail_income: RateMap,
}

/// Merge `tenures`, `monthly_aum_tenures`, `quarterly_aum_tenures`; later maps
/// overwrite earlier ones on key collision.
pub fn merged_tenures(scheme: &Scheme) -> RateMap {
    let mut merged = RateMap::new();
    for field in RateField::TENURE_SOURCES {
        if let Some(rates) = scheme.rate_map(field) {
            merged.extend(rates.iter().map(|(label, rate)| (label.clone(), *rate)));
        }
    }
    merged
}

pub fn tenures_for_scheme(conn: &Connection, name: &str) -> Result<SchemeTenures> {
    info!(scheme = %name, "fetching scheme data and tenures");

    let scheme = lookup_for_tenures(conn, name)?;
    let tenures = merged_tenures(&scheme);

    if tenures.is_empty() {
        return Err(SimulatorError::not_found(format!(
            "No tenures found for scheme '{}'",
            name
        )));
    }

    Ok(SchemeTenures {
        scheme: scheme.name,
        gst: scheme.gst_mode,
        payout: scheme.payout_mode,
        tenures,
        volume_incentives: scheme.volume_incentives.unwrap_or_default(),
        trail_income: scheme.trail_income.unwrap_or_default(),
    })
}

fn lookup_for_tenures(conn: &Connection, name: &str) -> Result<Scheme> {
    find_scheme_by_name(conn, name).map_err(|e| match e {
        SimulatorError::NotFound(_) => SimulatorError::not_found(format!(
            "Scheme '{}' not found in the database",
            name
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::entities::scheme::{create_scheme, NewScheme};
    use serde_json::json;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn add_scheme(conn: &Connection, body: serde_json::Value) {
        create_scheme(conn, NewScheme::from_json(&body).unwrap()).unwrap();
    }

    #[test]
    fn test_monthly_only() {
        let conn = test_conn();
        add_scheme(&conn, json!({"scheme": "M", "gst": "inclusive", "monthly_aum_tenures": {"Q1": 3}}));

        let result = tenures_for_scheme(&conn, "M").unwrap();

        assert_eq!(result.tenures.len(), 1);
        assert_eq!(result.tenures["Q1"], 3.0);
        assert!(result.volume_incentives.is_empty());
        assert!(result.trail_income.is_empty());
    }

    #[test]
    fn test_later_maps_win_on_collision() {
        let conn = test_conn();
        add_scheme(
            &conn,
            json!({
                "scheme": "Overlap",
                "gst": "exclusive",
                "payout": "quarterly",
                "tenures": {"12M": 5, "24M": 6},
                "monthly_aum_tenures": {"12M": 7},
                "quarterly_aum_tenures": {"12M": 9, "Q4": 1},
                "trail_income": {"AU Small Finance Bank": 0.25},
            }),
        );

        let result = tenures_for_scheme(&conn, "Overlap").unwrap();

        assert_eq!(result.tenures["12M"], 9.0);
        assert_eq!(result.tenures["24M"], 6.0);
        assert_eq!(result.tenures["Q4"], 1.0);
        assert_eq!(result.payout, Some(PayoutMode::Quarterly));
        assert_eq!(result.trail_income["AU Small Finance Bank"], 0.25);
    }

    #[test]
    fn test_no_tenure_maps() {
        let conn = test_conn();
        add_scheme(&conn, json!({"scheme": "Bare", "gst": "exclusive", "volume_incentives": {"1-5 Cr": 0.1}}));

        let err = tenures_for_scheme(&conn, "Bare").unwrap_err();
        assert!(matches!(err, SimulatorError::NotFound(_)));
        assert_eq!(err.to_string(), "No tenures found for scheme 'Bare'");
    }

    #[test]
    fn test_empty_tenure_maps_count_as_none() {
        let conn = test_conn();
        add_scheme(&conn, json!({"scheme": "Empty", "gst": "exclusive", "tenures": {}}));

        assert!(matches!(
            tenures_for_scheme(&conn, "Empty"),
            Err(SimulatorError::NotFound(_))
        ));
    }

    #[test]
    fn test_unknown_scheme() {
        let conn = test_conn();
        let err = tenures_for_scheme(&conn, "Ghost").unwrap_err();
        assert_eq!(err.to_string(), "Scheme 'Ghost' not found in the database");
    }

    #[test]
    fn test_wire_shape() {
        let conn = test_conn();
        add_scheme(&conn, json!({"scheme": "W", "gst": "inclusive", "tenures": {"1Y": 2}}));

        let value = serde_json::to_value(tenures_for_scheme(&conn, "W").unwrap()).unwrap();
        assert_eq!(value["scheme"], "W");
        assert_eq!(value["gst"], "inclusive");
        assert!(value["payout"].is_null());
        assert_eq!(value["volume_incentives"], json!({}));
    }
}
