//! aggregator
//!
//! Счётчики зон: сколько билетов категории в корзине и сколько всего,
//! плюс перевод желаемого количества в минимальный набор переключений.

use serde::Serialize;
use tracing::{debug, info};

use crate::geometry::{BoundsAcc, Rect};
use crate::models::{Inventory, Ticket, ToggleIntent};
use crate::registry::SeatRegistry;
use crate::scheme::{NodeId, SceneGraph, SceneNode};

/// Вместимость зоны: все билеты категории с семантикой зоны.
pub fn capacity(inventory: &Inventory, category: &str) -> usize {
    inventory.zone_tickets(category).count()
}

pub fn selected(inventory: &Inventory, category: &str) -> usize {
    inventory.zone_tickets(category).filter(|t| t.in_cart).count()
}

/// Первый свободный билет зоны в порядке списка.
pub fn first_available<'a>(inventory: &'a Inventory, category: &'a str) -> Option<&'a Ticket> {
    inventory.zone_tickets(category).find(|t| !t.in_cart)
}

/// Намерения, приводящие число билетов зоны в корзине к `min(desired, capacity)`.
///
/// Добавляются первые свободные билеты, убираются последние из корзины (порядок списка).
pub fn set_desired_count(inventory: &Inventory, category: &str, desired: usize) -> Vec<ToggleIntent> {
    let current = selected(inventory, category);
    let target = desired.min(capacity(inventory, category));

    let intents: Vec<ToggleIntent> = if target > current {
        inventory
            .zone_tickets(category)
            .filter(|t| !t.in_cart)
            .take(target - current)
            .map(|t| ToggleIntent::add(t.id.clone()))
            .collect()
    } else if target < current {
        let carted: Vec<&Ticket> = inventory.zone_tickets(category).filter(|t| t.in_cart).collect();
        carted[target..]
            .iter()
            .map(|t| ToggleIntent::remove(t.id.clone()))
            .collect()
    } else {
        Vec::new()
    };

    if desired > target {
        debug!("Zone {} capped at capacity {} (asked {})", category, target, desired);
    }
    if !intents.is_empty() {
        info!("Zone {}: {} -> {} ({} intents)", category, current, target, intents.len());
    }
    intents
}

/// Позиция счётчика в долях рамки сцены.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CounterAnchor {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCounter {
    pub category: String,
    pub capacity: usize,
    pub selected: usize,
    pub anchor: Option<CounterAnchor>,
    pub visible: bool,
}

/// Центр зоны по горизонтали, две трети высоты по вертикали.
pub fn counter_anchor(zone: Rect, frame: Rect) -> Option<CounterAnchor> {
    anchor_at(zone.x + zone.width / 2.0, zone.y + zone.height * 2.0 / 3.0, frame)
}

/// Счётчик под подписью зоны: центр подписи, 1.1 её высоты вниз.
pub fn title_anchor(title: Rect, frame: Rect) -> Option<CounterAnchor> {
    anchor_at(title.x + title.width / 2.0, title.y + title.height * 1.1, frame)
}

fn anchor_at(x: f64, y: f64, frame: Rect) -> Option<CounterAnchor> {
    if frame.is_degenerate() {
        return None;
    }
    Some(CounterAnchor {
        x: ((x - frame.x) / frame.width).clamp(0.0, 1.0),
        y: ((y - frame.y) / frame.height).clamp(0.0, 1.0),
    })
}

/// Подпись зоны - первый `<text>` внутри узла зоны.
fn title_bounds(scene: &SceneGraph, zone: NodeId) -> Option<Rect> {
    scene
        .descendants(zone)
        .into_iter()
        .skip(1)
        .filter(|&id| scene.node(id).and_then(SceneNode::tag) == Some("text"))
        .find_map(|id| scene.bounds(id))
}

/// Счётчики всех зон схемы. Пересчитываются после каждой привязки.
///
/// Якоря считаются в рамке поверхности, как и якорь тултипа.
pub fn counters(scene: &SceneGraph, registry: &SeatRegistry, inventory: &Inventory) -> Vec<CategoryCounter> {
    let frame = scene.surface_frame();

    registry
        .zone_categories()
        .into_iter()
        .map(|category| {
            let nodes = registry.zone_nodes(category);
            let anchor = frame.and_then(|frame| {
                if let Some(title) = nodes.iter().find_map(|&node| title_bounds(scene, node)) {
                    return title_anchor(title, frame);
                }
                let mut acc = BoundsAcc::default();
                for &node in nodes {
                    if let Some(rect) = scene.bounds(node) {
                        acc.rect(&rect);
                    }
                }
                acc.finish().and_then(|zone| counter_anchor(zone, frame))
            });

            let capacity = capacity(inventory, category);
            let selected = selected(inventory, category);
            CategoryCounter {
                category: category.to_string(),
                capacity,
                selected,
                anchor,
                visible: inventory.tickets().iter().any(|t| t.category == category && t.in_cart),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ticket, TicketId};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn zone_ticket(id: usize, in_cart: bool) -> Ticket {
        Ticket {
            id: TicketId::new(format!("df-{id}")),
            category: "dancefloor".into(),
            row: "0".into(),
            seat_number: "0".into(),
            in_cart,
            booking_expires_at: None,
            price: Some(5000.0),
        }
    }

    fn dancefloor(carted: &[usize]) -> Inventory {
        Inventory::new((0..10).map(|i| zone_ticket(i, carted.contains(&i))).collect())
    }

    fn ids(intents: &[ToggleIntent]) -> Vec<&str> {
        intents.iter().map(|i| i.ticket_id.as_str()).collect()
    }

    fn apply(inventory: &mut Inventory, intents: &[ToggleIntent]) {
        for intent in intents {
            inventory.apply_optimistic(intent, Utc::now(), Duration::minutes(15));
        }
    }

    #[test]
    fn adds_first_free_tickets() {
        let inv = dancefloor(&[]);
        let intents = set_desired_count(&inv, "dancefloor", 4);
        assert_eq!(ids(&intents), ["df-0", "df-1", "df-2", "df-3"]);
        assert!(intents.iter().all(|i| i.in_cart));
    }

    #[test]
    fn removes_last_carted_tickets() {
        let inv = dancefloor(&[1, 3, 4, 7]);
        let intents = set_desired_count(&inv, "dancefloor", 2);
        assert_eq!(ids(&intents), ["df-4", "df-7"]);
        assert!(intents.iter().all(|i| !i.in_cart));
    }

    #[test]
    fn same_count_is_noop_and_capacity_caps() {
        let inv = dancefloor(&[0, 1]);
        assert!(set_desired_count(&inv, "dancefloor", 2).is_empty());
        assert_eq!(set_desired_count(&inv, "dancefloor", 50).len(), 8);
        assert!(set_desired_count(&inv, "unknown", 3).is_empty());
    }

    #[test]
    fn anchor_sits_two_thirds_down() {
        let scene = Rect::new(0.0, 0.0, 200.0, 100.0);
        let zone = Rect::new(50.0, 30.0, 100.0, 60.0);
        let anchor = counter_anchor(zone, scene).unwrap();
        assert_eq!(anchor, CounterAnchor { x: 0.5, y: 0.7 });
        assert!(counter_anchor(zone, Rect::default()).is_none());
    }

    fn scene_counters(markup: &str, carted: &[usize]) -> Vec<CategoryCounter> {
        let scene = crate::scheme::normalize(markup, &[], &crate::scheme::FitRequest::default());
        let inv = dancefloor(carted);
        let (registry, _) = SeatRegistry::bind(&scene, &inv);
        counters(&scene, &registry, &inv)
    }

    #[test]
    fn counter_is_measured_in_surface_frame() {
        let counters = scene_counters(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
                <rect data-category="dancefloor" x="70" y="60" width="20" height="20"/>
            </svg>"#,
            &[0],
        );
        assert_eq!(counters.len(), 1);
        let anchor = counters[0].anchor.unwrap();
        assert!((anchor.x - 0.4).abs() < 1e-9);
        assert!((anchor.y - (60.0 + 40.0 / 3.0) / 100.0).abs() < 1e-9);
        assert!(counters[0].visible);
        assert_eq!((counters[0].selected, counters[0].capacity), (1, 10));
    }

    #[test]
    fn counter_sits_under_zone_title() {
        let counters = scene_counters(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100">
                <g data-category="dancefloor">
                    <rect x="0" y="0" width="200" height="100"/>
                    <text x="100" y="30" font-size="10" text-anchor="middle">Dance</text>
                </g>
            </svg>"#,
            &[],
        );
        let anchor = counters[0].anchor.unwrap();
        assert!((anchor.x - 0.5).abs() < 1e-9);
        assert!((anchor.y - 0.31).abs() < 1e-9);
        assert!(!counters[0].visible);
    }

    proptest! {
        #[test]
        fn desired_count_round_trip(
            carted in proptest::collection::vec(any::<bool>(), 0..30),
            desired in 0usize..40,
        ) {
            let mut inv = Inventory::new(
                carted.iter().enumerate().map(|(i, &c)| zone_ticket(i, c)).collect(),
            );
            let cap = capacity(&inv, "dancefloor");
            prop_assert!(selected(&inv, "dancefloor") <= cap);

            let intents = set_desired_count(&inv, "dancefloor", desired);
            apply(&mut inv, &intents);

            prop_assert_eq!(selected(&inv, "dancefloor"), desired.min(cap));
            prop_assert!(selected(&inv, "dancefloor") <= cap);
        }
    }
}
