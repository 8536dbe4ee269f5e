//! registry
//!
//! Реестр мест: связь `ключ места <-> визуальный узел <-> билет(ы)`.
//!
//! Привязка - чистая функция `bind(поверхность, инвентарь) -> (реестр, патчи)`.
//! Патчи применяются через `SeatView`, поэтому реестр не знает, чем нарисована схема.
//! Каждое обновление списка билетов - полный пересчёт, без инкрементальных правок:
//! схемы ограничены вместимостью зала (единицы тысяч мест).

pub mod headless;
pub mod view;

pub use headless::{HeadlessSeat, HeadlessSurface};
pub use view::{SeatSurface, SeatView};

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::models::{Inventory, SeatKey, TicketId};
use crate::scheme::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatKind {
    /// Одно место - один билет.
    Discrete { ticket_id: Option<TicketId> },
    /// Зона категории: много взаимозаменяемых билетов.
    Zone { ticket_ids: Vec<TicketId> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatEntry {
    pub key: SeatKey,
    pub category: String,
    pub kind: SeatKind,
    pub sellable: bool,
}

impl SeatEntry {
    pub fn is_zone(&self) -> bool {
        matches!(self.kind, SeatKind::Zone { .. })
    }
}

/// Атрибуты места после привязки.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatPatch {
    pub node: NodeId,
    pub checked: bool,
    pub disabled: bool,
    pub ticket_id: Option<TicketId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighlightPatch {
    pub node: NodeId,
    pub dimmed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SeatRegistry {
    entries: HashMap<NodeId, SeatEntry>,
    by_key: HashMap<SeatKey, NodeId>,
    by_ticket: HashMap<TicketId, NodeId>,
    zones: HashMap<String, Vec<NodeId>>,
}

impl SeatRegistry {
    /// Полная привязка мест поверхности к инвентарю.
    pub fn bind<S: SeatSurface>(surface: &S, inventory: &Inventory) -> (Self, Vec<SeatPatch>) {
        let mut registry = SeatRegistry::default();
        let seat_nodes = surface.seat_nodes();
        let mut patches = Vec::with_capacity(seat_nodes.len());

        for node in seat_nodes {
            let Some(seat) = surface.seat(node) else { continue };
            let Some(category) = seat.get("category").map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };

            let (entry, patch) = if seat.is_zone() {
                registry.bind_zone(node, category, inventory)
            } else {
                let key = SeatKey::new(category, seat.get("row"), seat.get("seat"));
                registry.bind_discrete(node, key, category, inventory)
            };
            registry.entries.insert(node, entry);
            patches.push(patch);
        }

        registry.log_unbound(inventory);
        (registry, patches)
    }

    fn bind_zone(&mut self, node: NodeId, category: &str, inventory: &Inventory) -> (SeatEntry, SeatPatch) {
        let ticket_ids: Vec<TicketId> = inventory.zone_tickets(category).map(|t| t.id.clone()).collect();
        let checked = inventory.zone_tickets(category).any(|t| t.in_cart);
        let sellable = !ticket_ids.is_empty();

        self.zones.entry(category.to_string()).or_default().push(node);

        let entry = SeatEntry {
            key: SeatKey::zone(category),
            category: category.to_string(),
            kind: SeatKind::Zone { ticket_ids },
            sellable,
        };
        let patch = SeatPatch { node, checked: sellable && checked, disabled: !sellable, ticket_id: None };
        (entry, patch)
    }

    fn bind_discrete(
        &mut self,
        node: NodeId,
        key: SeatKey,
        category: &str,
        inventory: &Inventory,
    ) -> (SeatEntry, SeatPatch) {
        let duplicate = self.by_key.contains_key(&key);
        if duplicate {
            warn!("Seat key {} is bound twice, node {:?} stays disabled", key, node);
        } else {
            self.by_key.insert(key.clone(), node);
        }

        // отсутствие билета - не ошибка: место вне текущего окна продаж
        let ticket = (!duplicate)
            .then(|| inventory.get(&TicketId::new(key.as_str())))
            .flatten();
        if let Some(ticket) = ticket {
            self.by_ticket.insert(ticket.id.clone(), node);
        }

        let ticket_id = ticket.map(|t| t.id.clone());
        let patch = SeatPatch {
            node,
            checked: ticket.is_some_and(|t| t.in_cart),
            disabled: ticket.is_none(),
            ticket_id: ticket_id.clone(),
        };
        let entry = SeatEntry {
            key,
            category: category.to_string(),
            kind: SeatKind::Discrete { ticket_id },
            sellable: ticket.is_some(),
        };
        (entry, patch)
    }

    fn log_unbound(&self, inventory: &Inventory) {
        let unbound: Vec<&TicketId> = inventory
            .tickets()
            .iter()
            .filter(|t| {
                if t.is_zone() {
                    !self.zones.contains_key(&t.category)
                } else {
                    !self.by_ticket.contains_key(&t.id)
                }
            })
            .map(|t| &t.id)
            .collect();

        if !unbound.is_empty() {
            debug!(
                "{} tickets have no node in the scheme (first: {})",
                unbound.len(),
                unbound[0]
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, node: NodeId) -> Option<&SeatEntry> {
        self.entries.get(&node)
    }

    pub fn is_sellable(&self, node: NodeId) -> bool {
        self.entry(node).is_some_and(|e| e.sellable)
    }

    /// Билет нумерованного места.
    pub fn ticket_for(&self, node: NodeId) -> Option<&TicketId> {
        match &self.entry(node)?.kind {
            SeatKind::Discrete { ticket_id } => ticket_id.as_ref(),
            SeatKind::Zone { .. } => None,
        }
    }

    pub fn node_for_ticket(&self, ticket_id: &TicketId) -> Option<NodeId> {
        self.by_ticket.get(ticket_id).copied()
    }

    pub fn node_for_key(&self, key: &SeatKey) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    pub fn zone_nodes(&self, category: &str) -> &[NodeId] {
        self.zones.get(category).map_or(&[], Vec::as_slice)
    }

    /// Категории, у которых в схеме есть зона (без повторов, в порядке ключа).
    pub fn zone_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.zones.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }
}

/// Применить патчи привязки через `SeatView`.
pub fn apply_patches<S: SeatSurface>(surface: &mut S, patches: &[SeatPatch]) {
    for patch in patches {
        let Some(seat) = surface.seat_mut(patch.node) else { continue };
        seat.set_checked(patch.checked);
        seat.set_disabled(patch.disabled);
        seat.set("ticket-id", patch.ticket_id.as_ref().map(TicketId::as_str));
    }
}

/// Подсветка категории: все места чужих категорий приглушаются.
/// Без состояния - пересчитывается при каждой смене подсвеченной категории.
pub fn highlight<S: SeatSurface>(surface: &S, category: Option<&str>) -> Vec<HighlightPatch> {
    surface
        .seat_nodes()
        .into_iter()
        .filter_map(|node| {
            let seat = surface.seat(node)?;
            let dimmed = category.is_some_and(|c| seat.get("category") != Some(c));
            Some(HighlightPatch { node, dimmed })
        })
        .collect()
}

pub fn apply_highlight<S: SeatSurface>(surface: &mut S, patches: &[HighlightPatch]) {
    for patch in patches {
        if let Some(seat) = surface.seat_mut(patch.node) {
            seat.set_dimmed(patch.dimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Ticket;
    use proptest::prelude::*;

    fn ticket(id: &str, category: &str, row: &str, seat: &str, in_cart: bool) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            category: category.into(),
            row: row.into(),
            seat_number: seat.into(),
            in_cart,
            booking_expires_at: None,
            price: Some(100.0),
        }
    }

    #[test]
    fn missing_discrete_ticket_disables_seat() {
        let mut surface = HeadlessSurface::from_seats(&[
            ("vip", Some("A"), Some("1")),
            ("vip", Some("A"), Some("2")),
            ("vip", Some("A"), Some("3")),
        ]);
        let inventory = Inventory::new(vec![
            ticket("seat-vip-A-1", "vip", "A", "1", true),
            ticket("seat-vip-A-2", "vip", "A", "2", false),
        ]);

        let (registry, patches) = SeatRegistry::bind(&surface, &inventory);
        apply_patches(&mut surface, &patches);

        let [a1, a2, a3] = [NodeId(0), NodeId(1), NodeId(2)];
        assert!(surface.seat(a1).unwrap().checked());
        assert!(!surface.seat(a2).unwrap().checked());
        assert!(!surface.seat(a2).unwrap().disabled());
        assert!(surface.seat(a3).unwrap().disabled());
        assert!(!registry.is_sellable(a3));
        assert_eq!(registry.ticket_for(a1).map(TicketId::as_str), Some("seat-vip-A-1"));
        assert_eq!(surface.seat(a1).unwrap().get("ticket-id"), Some("seat-vip-A-1"));
    }

    #[test]
    fn zone_checked_if_any_ticket_in_cart() {
        let mut surface = HeadlessSurface::from_seats(&[("floor", None, None), ("balcony", None, None)]);
        let inventory = Inventory::new(vec![
            ticket("f1", "floor", "0", "0", false),
            ticket("f2", "floor", "0", "0", true),
            ticket("seat-balcony-1-1", "balcony", "1", "1", false),
        ]);

        let (registry, patches) = SeatRegistry::bind(&surface, &inventory);
        apply_patches(&mut surface, &patches);

        let floor = surface.seat(NodeId(0)).unwrap();
        assert!(floor.checked() && !floor.disabled());
        // у балкона только нумерованный билет - зона недоступна
        assert!(surface.seat(NodeId(1)).unwrap().disabled());
        assert_eq!(registry.zone_nodes("floor"), &[NodeId(0)]);
        assert_eq!(registry.zone_categories(), vec!["balcony", "floor"]);
    }

    #[test]
    fn duplicate_keys_bind_once() {
        let surface = HeadlessSurface::from_seats(&[("vip", Some("1"), Some("1")), ("vip", Some("1"), Some("1"))]);
        let inventory = Inventory::new(vec![ticket("seat-vip-1-1", "vip", "1", "1", false)]);
        let (registry, patches) = SeatRegistry::bind(&surface, &inventory);
        assert!(registry.is_sellable(NodeId(0)));
        assert!(patches[1].disabled);
        assert_eq!(registry.node_for_ticket(&"seat-vip-1-1".into()), Some(NodeId(0)));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let mut surface = HeadlessSurface::from_seats(&[("vip", Some("1"), Some("1")), ("floor", None, None)]);
        let inventory = Inventory::new(vec![
            ticket("seat-vip-1-1", "vip", "1", "1", true),
            ticket("f1", "floor", "-1", "-1", true),
        ]);

        let (_, first) = SeatRegistry::bind(&surface, &inventory);
        apply_patches(&mut surface, &first);
        let snapshot = surface.clone();
        let (_, second) = SeatRegistry::bind(&surface, &inventory);
        apply_patches(&mut surface, &second);
        assert_eq!(first, second);
        assert_eq!(snapshot, surface);
    }

    #[test]
    fn highlight_dims_other_categories() {
        let mut surface = HeadlessSurface::from_seats(&[("vip", Some("1"), Some("1")), ("floor", None, None)]);
        let patches = highlight(&surface, Some("floor"));
        apply_highlight(&mut surface, &patches);
        assert!(surface.seat(NodeId(0)).unwrap().dimmed());
        assert!(!surface.seat(NodeId(1)).unwrap().dimmed());

        let cleared = highlight(&surface, None);
        apply_highlight(&mut surface, &cleared);
        assert!(!surface.seat(NodeId(0)).unwrap().dimmed());
    }

    proptest! {
        #[test]
        fn checked_mirrors_in_cart(
            seats in proptest::collection::vec(proptest::option::of(any::<bool>()), 1..40),
            zone in proptest::collection::vec(any::<bool>(), 0..10),
        ) {
            let rows: Vec<String> = (1..=seats.len()).map(|i| i.to_string()).collect();
            let mut layout: Vec<(&str, Option<&str>, Option<&str>)> =
                rows.iter().map(|r| ("hall", Some("1"), Some(r.as_str()))).collect();
            layout.push(("floor", None, None));
            let mut surface = HeadlessSurface::from_seats(&layout);

            let mut tickets: Vec<Ticket> = seats
                .iter()
                .zip(&rows)
                .filter_map(|(state, r)| state.map(|c| ticket(&format!("seat-hall-1-{r}"), "hall", "1", r, c)))
                .collect();
            tickets.extend(zone.iter().enumerate().map(|(i, &c)| ticket(&format!("f{i}"), "floor", "", "", c)));
            let inventory = Inventory::new(tickets);

            let (_, patches) = SeatRegistry::bind(&surface, &inventory);
            apply_patches(&mut surface, &patches);

            for (i, state) in seats.iter().enumerate() {
                let seat = surface.seat(NodeId(i)).unwrap();
                prop_assert_eq!(seat.disabled(), state.is_none());
                prop_assert_eq!(seat.checked(), state.unwrap_or(false));
            }
            let floor = surface.seat(NodeId(seats.len())).unwrap();
            prop_assert_eq!(floor.checked(), zone.iter().any(|&c| c));
            prop_assert_eq!(floor.disabled(), zone.is_empty());
        }
    }
}
