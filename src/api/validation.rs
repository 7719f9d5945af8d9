//! Field validation for `POST /metrics`.
//!
//! Checks run in a fixed order and stop at the first failure: body presence,
//! required fields, field types, counter signs, then email syntax. A field
//! counts as missing when it is absent, `null`, or a blank string. Zero is a
//! valid counter value.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::contracts::{MetricSubmission, ValidationError};

const TEXT_FIELDS: [&str; 2] = ["user_github", "email"];
const REQUIRED_COUNTERS: [&str; 2] = ["quant_clicks", "quant_dist"];
const OPTIONAL_COUNTERS: [&str; 2] = ["quant_scrow", "quant_keys"];

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Returns true if `email` has the `local@domain.tld` shape.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Parses and validates a raw request body.
pub fn parse_submission(body: &[u8]) -> Result<MetricSubmission, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingBody);
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidJson(e.to_string()))?;

    match value {
        Value::Object(fields) => validate_submission(&fields),
        _ => Err(ValidationError::NotAnObject),
    }
}

/// Validates an already-parsed JSON object.
pub fn validate_submission(fields: &Map<String, Value>) -> Result<MetricSubmission, ValidationError> {
    let missing: Vec<&'static str> = TEXT_FIELDS
        .iter()
        .chain(REQUIRED_COUNTERS.iter())
        .copied()
        .filter(|name| is_missing(fields.get(*name)))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    let mut wrong_type: Vec<&'static str> = TEXT_FIELDS
        .iter()
        .copied()
        .filter(|name| !matches!(fields.get(*name), Some(Value::String(_))))
        .collect();
    wrong_type.extend(
        REQUIRED_COUNTERS
            .iter()
            .chain(OPTIONAL_COUNTERS.iter())
            .copied()
            .filter(|name| match fields.get(*name) {
                None | Some(Value::Null) | Some(Value::Number(_)) => false,
                Some(_) => true,
            }),
    );
    if !wrong_type.is_empty() {
        return Err(ValidationError::InvalidTypes(wrong_type));
    }

    let counter = |name: &'static str| -> Result<f64, ValidationError> {
        let value = fields.get(name).and_then(Value::as_f64).unwrap_or(0.0);
        if value < 0.0 {
            return Err(ValidationError::NegativeValue(name));
        }
        // -0.0 passes the sign check; fold it into 0.0
        Ok(value + 0.0)
    };
    let quant_clicks = counter("quant_clicks")?;
    let quant_dist = counter("quant_dist")?;
    let quant_scrow = counter("quant_scrow")?;
    let quant_keys = counter("quant_keys")?;

    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let user_github = text("user_github");
    let email = text("email");

    if !is_valid_email(&email) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(MetricSubmission {
        user_github,
        email,
        quant_clicks,
        quant_dist,
        quant_scrow,
        quant_keys,
    })
}
