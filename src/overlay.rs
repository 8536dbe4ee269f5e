//! Данные для слоя представления: что показать в тултипе и счётчиках и где.
//! Как это рисуется - забота хоста.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::CategoryCounter;
use crate::geometry::TooltipState;
use crate::gesture::InputKind;
use crate::models::{category, Category, Ticket};
use crate::registry::SeatView;

const FALLBACK_COLOR: &str = "#fff";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipContent {
    pub price_label: String,
    pub category_name: String,
    pub color: String,
    pub icon: Option<String>,
    pub text: Option<String>,
    pub row: Option<String>,
    pub seat: Option<String>,
    pub action_label: String,
    pub in_cart: bool,
    pub disabled: bool,
}

impl TooltipContent {
    pub fn build<V: SeatView + ?Sized>(
        seat: &V,
        ticket: Option<&Ticket>,
        categories: &[Category],
        currency: &str,
        input: InputKind,
    ) -> Self {
        let key = seat.get("category").unwrap_or_default();
        let found = category::find(categories, key);
        let disabled = seat.disabled() || ticket.is_none();
        let in_cart = ticket.is_some_and(|t| t.in_cart);

        let price_label = match ticket.and_then(|t| t.price) {
            _ if disabled => "SOLD".to_string(),
            Some(price) if price.is_finite() => format!("{}\u{a0}{}", format_price(price), currency),
            _ => format!("-\u{a0}{currency}"),
        };
        let action_label = match (disabled, in_cart, input) {
            (true, _, _) => "Unavailable",
            (false, true, _) => "Selected",
            (false, false, InputKind::Touch) => "Tap to select",
            (false, false, InputKind::Pointer) => "Click to select",
        };

        Self {
            price_label,
            category_name: found.map_or(key, |c| c.name.as_str()).to_string(),
            color: found.map_or(FALLBACK_COLOR, |c| c.color.as_str()).to_string(),
            icon: found.and_then(|c| c.icon.clone()),
            text: seat.get("text").filter(|t| !t.is_empty()).map(str::to_string),
            row: seat.get("row").map(str::to_string),
            seat: seat.get("seat").map(str::to_string),
            action_label: action_label.to_string(),
            in_cart,
            disabled,
        }
    }
}

// целые суммы без копеек, остальное до двух знаков
fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round();
    if cents % 100.0 == 0.0 {
        format!("{:.0}", cents / 100.0)
    } else {
        format!("{:.2}", cents / 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipView {
    pub left: String,
    pub top: String,
    pub flipped: bool,
    pub scale: f64,
    pub hide_delay_ms: u64,
    pub content: TooltipContent,
}

impl TooltipView {
    pub fn new(state: &TooltipState, content: TooltipContent) -> Self {
        Self {
            left: state.css_left(),
            top: state.css_top(),
            flipped: state.flipped,
            scale: state.scale,
            hide_delay_ms: state.hide_delay_ms,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterView {
    pub category: String,
    pub selected: usize,
    pub capacity: usize,
    pub left: String,
    pub top: String,
}

impl CounterView {
    /// Только видимые счётчики с известной позицией.
    pub fn from_counter(counter: &CategoryCounter) -> Option<Self> {
        let anchor = counter.anchor.filter(|_| counter.visible)?;
        Some(Self {
            category: counter.category.clone(),
            selected: counter.selected,
            capacity: counter.capacity,
            left: format!("{:.2}%", anchor.x * 100.0),
            top: format!("{:.2}%", anchor.y * 100.0),
        })
    }
}

/// Снимок всего, что нужно отрисовать поверх схемы.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFrame {
    pub tooltip: Option<TooltipView>,
    pub counters: Vec<CounterView>,
    pub booking_limit: Option<DateTime<Utc>>,
    pub highlight: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketId;
    use crate::registry::HeadlessSeat;

    fn vip() -> Vec<Category> {
        vec![Category { value: "vip".into(), name: "VIP".into(), color: "#e74c3c".into(), icon: None }]
    }

    fn ticket(in_cart: bool, price: Option<f64>) -> Ticket {
        Ticket {
            id: TicketId::new("seat-vip-1-2"),
            category: "vip".into(),
            row: "1".into(),
            seat_number: "2".into(),
            in_cart,
            booking_expires_at: None,
            price,
        }
    }

    #[test]
    fn available_seat_content() {
        let mut seat = HeadlessSeat::new("vip", Some("1"), Some("2"));
        seat.set("text", Some("Near the stage"));
        let t = ticket(false, Some(2500.0));
        let content = TooltipContent::build(&seat, Some(&t), &vip(), "₸", InputKind::Touch);
        assert_eq!(content.price_label, "2500\u{a0}₸");
        assert_eq!(content.category_name, "VIP");
        assert_eq!(content.color, "#e74c3c");
        assert_eq!(content.text.as_deref(), Some("Near the stage"));
        assert_eq!(content.action_label, "Tap to select");
    }

    #[test]
    fn sold_and_unknown_category() {
        let mut seat = HeadlessSeat::new("balcony", Some("3"), Some("7"));
        seat.set_disabled(true);
        let content = TooltipContent::build(&seat, None, &vip(), "₸", InputKind::Pointer);
        assert_eq!(content.price_label, "SOLD");
        assert_eq!(content.action_label, "Unavailable");
        assert_eq!(content.category_name, "balcony");
        assert_eq!(content.color, "#fff");
    }

    #[test]
    fn selected_without_price() {
        let seat = HeadlessSeat::new("vip", Some("1"), Some("2"));
        let t = ticket(true, None);
        let content = TooltipContent::build(&seat, Some(&t), &vip(), "$", InputKind::Pointer);
        assert_eq!(content.price_label, "-\u{a0}$");
        assert_eq!(content.action_label, "Selected");
    }

    #[test]
    fn price_formatting_rounds_without_truncation() {
        assert_eq!(format_price(1500.0), "1500");
        assert_eq!(format_price(1500.004), "1500");
        assert_eq!(format_price(1500.5), "1500.50");
        assert_eq!(format_price(1e20), "100000000000000000000");

        let seat = HeadlessSeat::new("vip", Some("1"), Some("2"));
        let t = ticket(false, Some(f64::NAN));
        let content = TooltipContent::build(&seat, Some(&t), &vip(), "$", InputKind::Pointer);
        assert_eq!(content.price_label, "-\u{a0}$");
    }
}
