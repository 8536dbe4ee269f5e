use std::fmt::Write as _;
use tracing::warn;

use super::{NodeKind, SceneGraph, SceneNode, SEAT_CLASS};
use crate::models::Category;

pub const CHECK_SEAT_PATH_ID: &str = "checked-seat-path";
pub const CHECK_CATEGORY_PATH_ID: &str = "checked-category-path";
pub const STYLE_ID: &str = "seatmap-category-styles";
pub const DIMMED_FILL: &str = "#666";

struct Marker {
    id: &'static str,
    class: &'static str,
    d: &'static str,
}

const MARKERS: [Marker; 2] = [
    // черная галочка для мест
    Marker { id: CHECK_SEAT_PATH_ID, class: "seat-check", d: "M 1.5 3.5 L 3 5 L 6 2" },
    // белая галочка для категории без мест
    Marker { id: CHECK_CATEGORY_PATH_ID, class: "category-check", d: "M 1 3 L 4.25 6.25 L 10 0.5" },
];

/// Положить галочки в `<defs>` (создаётся первым потомком корня, если его нет).
pub fn inject_markers(graph: &mut SceneGraph) {
    let Some(root) = graph.root() else { return };
    let defs = match graph.find_child(root, "defs") {
        Some(defs) => defs,
        None => graph.insert_child(root, 0, SceneNode::element("defs", Vec::new())),
    };

    for marker in &MARKERS {
        if graph.find_by_id(marker.id).is_some() {
            continue;
        }
        let attrs = vec![
            ("id".to_string(), marker.id.to_string()),
            ("class".to_string(), marker.class.to_string()),
            ("d".to_string(), marker.d.to_string()),
            ("stroke-linecap".to_string(), "round".to_string()),
            ("stroke-linejoin".to_string(), "round".to_string()),
        ];
        let len = graph.node(defs).map_or(0, |n| n.children.len());
        graph.insert_child(defs, len, SceneNode::element("path", attrs));
    }
}

/// Сгенерировать `<style>` с заливкой по цвету каждой категории.
pub fn inject_styles(graph: &mut SceneGraph, categories: &[Category]) {
    let Some(root) = graph.root() else { return };
    let css = category_css(categories);

    let existing = graph
        .node(root)
        .map(|n| n.children.clone())
        .unwrap_or_default()
        .into_iter()
        .find(|&child| graph.node(child).and_then(|n| n.attr("id")) == Some(STYLE_ID));

    let style = match existing {
        Some(style) => style,
        None => {
            let index = graph
                .find_child(root, "defs")
                .and_then(|defs| graph.node(root).and_then(|n| n.children.iter().position(|&c| c == defs)))
                .map_or(0, |pos| pos + 1);
            let attrs = vec![("id".to_string(), STYLE_ID.to_string())];
            graph.insert_child(root, index, SceneNode::element("style", attrs))
        }
    };

    let text = graph.insert_child(style, 0, SceneNode::text(&css));
    if let Some(node) = graph.node_mut(style) {
        node.children.retain(|&c| c == text);
    }
}

pub fn category_css(categories: &[Category]) -> String {
    let mut css = String::new();
    for category in categories {
        if !is_safe_color(&category.color) {
            warn!("Skipping style for category {}: unsupported color {:?}", category.value, category.color);
            continue;
        }
        let _ = writeln!(
            css,
            ".{SEAT_CLASS}[data-category=\"{}\"] {{ fill: {}; }}",
            escape_css_string(&category.value),
            category.color.trim()
        );
    }
    let _ = writeln!(css, ".{SEAT_CLASS}[data-disabled] {{ fill: {DIMMED_FILL}; cursor: default; }}");
    css
}

fn escape_css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Цвета приходят из внешних данных - пропускаем только то, что похоже на цвет CSS.
fn is_safe_color(color: &str) -> bool {
    let color = color.trim();
    !color.is_empty()
        && color
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' '))
}

impl SceneGraph {
    /// Текст сгенерированного блока стилей (для проверки и отладки).
    pub fn category_styles(&self) -> Option<&str> {
        let style = self.find_by_id(STYLE_ID)?;
        let child = *self.node(style)?.children.first()?;
        match &self.node(child)?.kind {
            NodeKind::Text(css) => Some(css),
            NodeKind::Element { .. } => None,
        }
    }
}
