use serde::{Deserialize, Serialize};
use std::fmt;

use super::TicketId;

pub const SEAT_KEY_PREFIX: &str = "seat";

/// Ключ места: `seat-{category}-{row}-{seat}`, пустые части пропускаются.
/// Он же id узла в схеме и id билета для нумерованных мест.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatKey(String);

impl SeatKey {
    pub fn new(category: &str, row: Option<&str>, seat: Option<&str>) -> Self {
        let parts = [Some(category), row, seat]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty());

        let mut key = String::from(SEAT_KEY_PREFIX);
        for part in parts {
            key.push('-');
            key.push_str(part);
        }
        Self(key)
    }

    /// Ключ зоны - только категория.
    pub fn zone(category: &str) -> Self {
        Self::new(category, None, None)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, ticket_id: &TicketId) -> bool {
        self.0 == ticket_id.as_str()
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_empty_components() {
        assert_eq!(SeatKey::new("vip", Some("A"), Some("1")).as_str(), "seat-vip-A-1");
        assert_eq!(SeatKey::new("vip", Some(""), Some("1")).as_str(), "seat-vip-1");
        assert_eq!(SeatKey::zone("dancefloor").as_str(), "seat-dancefloor");
    }

    #[test]
    fn joins_to_ticket_ids() {
        let key = SeatKey::new("vip", Some("1"), Some("3"));
        assert!(key.matches(&TicketId::new("seat-vip-1-3")));
        assert!(!key.matches(&TicketId::new("seat-vip-1-4")));
    }
}
