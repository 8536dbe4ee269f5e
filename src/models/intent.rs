use serde::{Deserialize, Serialize};

use super::TicketId;

/// Единственный сигнал изменения, который движок отдает наружу.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleIntent {
    pub ticket_id: TicketId,
    pub in_cart: bool,
}

impl ToggleIntent {
    pub fn add(ticket_id: TicketId) -> Self {
        Self { ticket_id, in_cart: true }
    }

    pub fn remove(ticket_id: TicketId) -> Self {
        Self { ticket_id, in_cart: false }
    }
}
