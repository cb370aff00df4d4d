//! Argument value parsing

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use fortune_core::Attributes;
use serde_json::Value;

/// Parse `key=value` pairs into an attribute bag
///
/// Integers, decimals and `true`/`false` become JSON numbers and booleans;
/// everything else stays a string.
pub(crate) fn attributes<'a>(
    pairs: impl IntoIterator<Item = &'a String>,
) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("attribute '{pair}' is not of the form key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("attribute '{pair}' has an empty key");
        }
        attributes.insert(key, parse_value(raw.trim()));
    }
    Ok(attributes)
}

fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(x) = raw.parse::<f64>() {
        if x.is_finite() {
            return Value::from(x);
        }
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::from(raw),
    }
}

/// Parse a `YYYY-MM-DD` date
pub(crate) fn date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}
