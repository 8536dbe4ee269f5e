use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::error;

use super::bounds::transformed_bounds;
use super::defs::{CHECK_CATEGORY_PATH_ID, CHECK_SEAT_PATH_ID};
use super::parse::{SVG_NS, XLINK_NS};
use super::{NodeId, NodeKind, SceneGraph, SEAT_CLASS};
use crate::registry::SeatView;

/// Отступ галочки от левого верхнего угла места.
const SEAT_CHECK_OFFSET: (f64, f64) = (1.5, 1.8);
/// Половина размера галочки категории (10 x 6.25).
const CATEGORY_CHECK_HALF: (f64, f64) = (5.0, 3.125);

/// Сериализация аннотированной сцены обратно в SVG.
///
/// Размеры корня берутся из подгонки поверхности. Отмеченные места получают
/// `<use>` на галочку из `<defs>` сразу после себя.
pub fn to_svg(graph: &SceneGraph) -> String {
    let Some(root) = graph.root() else {
        return String::new();
    };

    let mut writer = Writer::new(Vec::new());
    if let Err(e) = write_node(graph, root, &mut writer) {
        error!("Failed to serialize scheme: {}", e);
        return String::new();
    }
    String::from_utf8(writer.into_inner()).unwrap_or_default()
}

fn write_node(graph: &SceneGraph, id: NodeId, writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
    let Some(node) = graph.node(id) else { return Ok(()) };

    let (tag, attrs) = match &node.kind {
        NodeKind::Text(text) => {
            writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text.as_str()))))?;
            return Ok(());
        }
        NodeKind::Element { tag, attrs } => (tag, attrs),
    };

    let mut start = BytesStart::new(tag.as_str());
    if node.parent.is_none() {
        start.push_attribute(("xmlns", SVG_NS));
        start.push_attribute(("xmlns:xlink", XLINK_NS));
        if let Some(fit) = graph.fit() {
            start.push_attribute(("width", format_number(fit.width).as_str()));
            start.push_attribute(("height", format_number(fit.height).as_str()));
        }
    }
    for (name, value) in attrs {
        if node.parent.is_none() && matches!(name.as_str(), "xmlns" | "xmlns:xlink" | "width" | "height") {
            continue;
        }
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if node.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        for &child in &node.children {
            write_node(graph, child, writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
    }

    if node.has_class(SEAT_CLASS) && node.checked() {
        write_check_mark(graph, id, node.is_zone(), writer)?;
    }
    Ok(())
}

fn write_check_mark(
    graph: &SceneGraph,
    id: NodeId,
    zone: bool,
    writer: &mut Writer<Vec<u8>>,
) -> Result<(), quick_xml::Error> {
    // галочка - соседний элемент, поэтому координаты в системе родителя
    let Some(rect) = transformed_bounds(graph, id) else { return Ok(()) };
    let (href, x, y) = if zone {
        (
            CHECK_CATEGORY_PATH_ID,
            rect.x + rect.width / 2.0 - CATEGORY_CHECK_HALF.0,
            rect.y + rect.height / 2.0 - CATEGORY_CHECK_HALF.1,
        )
    } else {
        (CHECK_SEAT_PATH_ID, rect.x + SEAT_CHECK_OFFSET.0, rect.y + SEAT_CHECK_OFFSET.1)
    };

    let mut mark = BytesStart::new("use");
    mark.push_attribute(("href", format!("#{href}").as_str()));
    mark.push_attribute(("x", format_number(x).as_str()));
    mark.push_attribute(("y", format_number(y).as_str()));
    mark.push_attribute(("pointer-events", "none"));
    writer.write_event(Event::Empty(mark))?;
    Ok(())
}

fn format_number(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
