use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Rates come back as JSON numbers, but older responses quote them as strings and
/// unpublished ones are `null`; all three forms are accepted.
pub fn de_opt_rate<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(num) => num
            .as_f64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("rate out of range")),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid rate '{s}'"))),
        _ => Err(serde::de::Error::custom("invalid type for rate")),
    }
}

/// Parse a displayed price such as `1,234.50`; thousands separators are dropped first.
pub fn parse_price(text: &str) -> Result<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite())
        .ok_or_else(|| Error::Parse {
            what: "price",
            input: text.trim().to_string(),
        })
}

/// Listing dates are printed as `13 Sep 2004` on profile pages; ISO dates are taken too.
pub fn parse_listing_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    ["%d %b %Y", "%d-%b-%Y", "%d/%m/%Y", econdb_util::ISO_DATE]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .ok_or_else(|| Error::Parse {
            what: "listing date",
            input: text.to_string(),
        })
}
