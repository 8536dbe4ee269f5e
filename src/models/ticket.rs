use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::de;

/// Значения ряда/места, которыми инвентарь помечает билеты танцпола (зоны без мест).
pub const ZONE_SENTINELS: [&str; 2] = ["0", "-1"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(#[serde(deserialize_with = "de::string_or_number")] pub String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    #[serde(deserialize_with = "de::string_or_number")]
    pub category: String,
    #[serde(default, deserialize_with = "de::string_or_number")]
    pub row: String,
    #[serde(default, alias = "seat", deserialize_with = "de::string_or_number")]
    pub seat_number: String,
    #[serde(default)]
    pub in_cart: bool,
    #[serde(default, alias = "bookingLimit", deserialize_with = "de::opt_timestamp")]
    pub booking_expires_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de::opt_price")]
    pub price: Option<f64>,
}

impl Ticket {
    /// Билет зоны (общий вход): ряд или место пустые либо равны служебным значениям.
    pub fn is_zone(&self) -> bool {
        is_sentinel(&self.row) || is_sentinel(&self.seat_number)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.in_cart && self.booking_expires_at.is_some_and(|until| until <= now)
    }
}

fn is_sentinel(value: &str) -> bool {
    let value = value.trim();
    value.is_empty() || ZONE_SENTINELS.contains(&value)
}
