// 📐 Shape checks shared by every write path
// Create and partial update both go through these, so a rate map that is
// rejected on insert is rejected on update too.

use serde_json::{Map, Value};

use crate::entities::scheme::RateMap;
use crate::error::{Result, SimulatorError};

/// Tolerance used when checking that split shares add up to 100
pub const SHARE_SUM_TOLERANCE: f64 = 1e-9;

/// Read a required string field. Blank strings count as missing.
pub fn required_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Same as [`required_text`] for values already pulled out of a typed body
pub fn present_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Validate one rate-map field.
///
/// `None` and `null` mean "not provided". Anything else must be a JSON object
/// whose values are all finite numbers.
pub fn validate_rate_map(field: &str, value: Option<&Value>) -> Result<Option<RateMap>> {
    let object = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(invalid_field(field)),
    };

    let mut rates = RateMap::new();
    for (label, rate) in object {
        let rate = rate
            .as_f64()
            .filter(|r| r.is_finite())
            .ok_or_else(|| invalid_field(field))?;
        rates.insert(label.clone(), rate);
    }

    Ok(Some(rates))
}

/// A percentage in [0, 100]
pub fn validate_percentage(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(SimulatorError::invalid(format!(
            "{} must be between 0 and 100",
            field
        )));
    }
    Ok(value)
}

/// Three-way split must add up to exactly 100 (within float tolerance)
pub fn validate_share_sum(shares: [f64; 3]) -> Result<()> {
    let total: f64 = shares.iter().sum();
    if (total - 100.0).abs() > SHARE_SUM_TOLERANCE {
        return Err(SimulatorError::invalid("Total percentage must equal 100%"));
    }
    Ok(())
}

fn invalid_field(field: &str) -> SimulatorError {
    SimulatorError::invalid(format!("Invalid data for field: {}", field))
}
