use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{Inventory, ToggleIntent};

/// Снятие билетов с истёкшей бронью, не дожидаясь нового списка от источника.
#[derive(Debug, Clone, Default)]
pub struct ExpirySweeper;

impl ExpirySweeper {
    pub fn new() -> Self {
        Self
    }

    /// Намерения "убрать из корзины" для всех просроченных билетов, в порядке списка.
    pub fn sweep(&self, inventory: &Inventory, now: DateTime<Utc>) -> Vec<ToggleIntent> {
        let expired: Vec<ToggleIntent> = inventory
            .tickets()
            .iter()
            .filter(|t| t.is_expired(now))
            .map(|t| ToggleIntent::remove(t.id.clone()))
            .collect();

        if !expired.is_empty() {
            info!("⏰ Found {} expired bookings to release", expired.len());
        }
        expired
    }

    pub fn stats(&self, inventory: &Inventory, now: DateTime<Utc>) -> ExpiryStats {
        let carted = inventory.tickets().iter().filter(|t| t.in_cart).count();
        let expired = inventory.tickets().iter().filter(|t| t.is_expired(now)).count();
        ExpiryStats { carted, expired, booking_limit: inventory.booking_limit() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryStats {
    pub carted: usize,
    pub expired: usize,
    pub booking_limit: Option<DateTime<Utc>>,
}

impl ExpiryStats {
    /// Сколько осталось до ближайшего истечения брони.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.booking_limit.map(|limit| (limit - now).max(chrono::Duration::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ticket, TicketId};
    use chrono::Duration;

    fn carted(id: &str, expires: Option<DateTime<Utc>>) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            category: "vip".into(),
            row: "1".into(),
            seat_number: id.into(),
            in_cart: true,
            booking_expires_at: expires,
            price: None,
        }
    }

    #[test]
    fn releases_only_expired() {
        let now = Utc::now();
        let inventory = Inventory::new(vec![
            carted("1", Some(now - Duration::seconds(1))),
            carted("2", Some(now + Duration::minutes(5))),
            carted("3", None),
        ]);
        let sweeper = ExpirySweeper::new();
        assert_eq!(sweeper.sweep(&inventory, now), vec![ToggleIntent::remove("1".into())]);

        let stats = sweeper.stats(&inventory, now);
        assert_eq!((stats.carted, stats.expired), (3, 1));
        assert_eq!(stats.remaining(now), Some(Duration::zero()));
    }
}
