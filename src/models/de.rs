//! Терпимые десериализаторы для данных инвентаря.
//!
//! Источник билетов отдает идентификаторы, ряды и места то строками, то числами,
//! а срок брони - то миллисекундами, то RFC 3339, то `0`/`null` вместо пустого значения.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = string_or_number(deserializer)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

pub fn opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => match n.as_i64() {
            Some(0) | None => Ok(None),
            Some(ms) => Ok(Utc.timestamp_millis_opt(ms).single()),
        },
        Value::String(s) if s.is_empty() || s == "0" => Ok(None),
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "opt_timestamp")]
        until: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "opt_price")]
        price: Option<f64>,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let p: Probe = serde_json::from_str(r#"{"id": 42, "until": 0, "price": "1500.5"}"#).unwrap();
        assert_eq!(p.id, "42");
        assert!(p.until.is_none());
        assert_eq!(p.price, Some(1500.5));

        let p: Probe =
            serde_json::from_str(r#"{"id": "seat-vip-1-2", "until": 1700000000000}"#).unwrap();
        assert_eq!(p.id, "seat-vip-1-2");
        assert_eq!(p.until.unwrap().timestamp(), 1_700_000_000);
        assert!(p.price.is_none());
    }
}
