use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::{Ticket, TicketId, ToggleIntent};

/// Локальная копия списка билетов. Каждое обновление от источника заменяет её целиком.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    tickets: Vec<Ticket>,
    index: HashMap<TicketId, usize>,
}

impl Inventory {
    pub fn new(tickets: Vec<Ticket>) -> Self {
        let mut index = HashMap::with_capacity(tickets.len());
        for (pos, ticket) in tickets.iter().enumerate() {
            // при дублях побеждает первый, как и при поиске по списку
            index.entry(ticket.id.clone()).or_insert(pos);
        }
        Self { tickets, index }
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn get(&self, id: &TicketId) -> Option<&Ticket> {
        self.index.get(id).map(|&pos| &self.tickets[pos])
    }

    /// Билеты зоны категории в порядке списка.
    pub fn zone_tickets<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Ticket> + 'a {
        self.tickets
            .iter()
            .filter(move |t| t.category == category && t.is_zone())
    }

    /// Ближайший срок брони среди билетов в корзине (источник обратного отсчёта).
    pub fn booking_limit(&self) -> Option<DateTime<Utc>> {
        self.tickets
            .iter()
            .filter(|t| t.in_cart)
            .filter_map(|t| t.booking_expires_at)
            .min()
    }

    /// Оптимистично применить намерение до прихода авторитетного списка.
    /// При добавлении срок брони берётся общий для корзины или `now + hold`.
    pub fn apply_optimistic(&mut self, intent: &ToggleIntent, now: DateTime<Utc>, hold: Duration) -> bool {
        let Some(&pos) = self.index.get(&intent.ticket_id) else {
            debug!("Optimistic update skipped, ticket {} is not in inventory", intent.ticket_id);
            return false;
        };

        let limit = self.booking_limit().unwrap_or(now + hold);
        let ticket = &mut self.tickets[pos];
        if ticket.in_cart == intent.in_cart {
            return false;
        }
        ticket.in_cart = intent.in_cart;
        ticket.booking_expires_at = intent.in_cart.then_some(limit);
        true
    }
}
