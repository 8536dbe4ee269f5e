use roxmltree::{Document, Node, NodeType, ParsingOptions};

use super::{NodeId, SceneGraph, SceneNode};
use crate::error::SchemeError;
use crate::geometry::Rect;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Сырой SVG -> дерево сцены. Элементы чужих пространств имён (метаданные редакторов) отбрасываются.
pub fn parse(markup: &str) -> Result<SceneGraph, SchemeError> {
    if markup.trim().is_empty() {
        return Err(SchemeError::Empty);
    }

    // экспорт из редакторов обычно начинается с <!DOCTYPE svg PUBLIC ...>
    let options = ParsingOptions { allow_dtd: true, ..ParsingOptions::default() };
    let doc = Document::parse_with_options(markup, options)?;
    let root = doc.root_element();
    let root_tag = root.tag_name().name();
    if root_tag != "svg" {
        return Err(SchemeError::UnexpectedRoot(root_tag.to_string()));
    }

    let mut graph = SceneGraph::empty();
    copy_node(&mut graph, root, None);
    graph.view_box = graph
        .root
        .and_then(|id| graph.node(id))
        .and_then(|node| node.attr("viewBox"))
        .and_then(parse_view_box);

    Ok(graph)
}

fn copy_node(graph: &mut SceneGraph, node: Node<'_, '_>, parent: Option<NodeId>) {
    match node.node_type() {
        NodeType::Element => {
            if !is_svg_element(&node) {
                return;
            }
            let attrs = node
                .attributes()
                .filter_map(|attr| {
                    let name = match attr.namespace() {
                        None => attr.name().to_string(),
                        Some(XLINK_NS) => format!("xlink:{}", attr.name()),
                        Some(XML_NS) => format!("xml:{}", attr.name()),
                        Some(_) => return None,
                    };
                    Some((name, attr.value().to_string()))
                })
                .collect();

            let id = graph.push(SceneNode::element(node.tag_name().name(), attrs), parent);
            for child in node.children() {
                copy_node(graph, child, Some(id));
            }
        }
        NodeType::Text => {
            let Some(text) = node.text() else { return };
            if text.trim().is_empty() {
                return;
            }
            graph.push(SceneNode::text(text), parent);
        }
        // комментарии и инструкции обработки не нужны
        _ => {}
    }
}

fn is_svg_element(node: &Node<'_, '_>) -> bool {
    matches!(node.tag_name().namespace(), None | Some(SVG_NS))
}

/// `viewBox="min-x min-y width height"` (разделители - пробелы и/или запятые).
pub fn parse_view_box(raw: &str) -> Option<Rect> {
    let parts: Vec<f64> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some(Rect::new(*x, *y, *w, *h)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_svg_elements_and_text() {
        let graph = parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
                    xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape" viewBox="0,0,10,5">
                <!-- editor comment -->
                <inkscape:grid/>
                <text x="1" y="2" inkscape:label="t">Stage</text>
                <use xlink:href="#x"/>
            </svg>"##,
        )
        .unwrap();

        let root = graph.root().unwrap();
        let children = &graph.node(root).unwrap().children;
        assert_eq!(children.len(), 2);
        let text = graph.node(children[0]).unwrap();
        assert_eq!(text.tag(), Some("text"));
        assert!(text.attr("inkscape:label").is_none());
        let use_node = graph.node(children[1]).unwrap();
        assert_eq!(use_node.attr("xlink:href"), Some("#x"));
        assert_eq!(graph.view_box(), Some(Rect::new(0.0, 0.0, 10.0, 5.0)));
    }

    #[test]
    fn accepts_doctype_header() {
        let graph = parse(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd">
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 40 20">
    <rect data-category="vip" data-row="1" data-seat="1" x="0" y="0" width="10" height="10"/>
    <rect data-category="vip" data-row="1" data-seat="2" x="20" y="0" width="10" height="10"/>
</svg>"#,
        )
        .unwrap();

        let root = graph.root().unwrap();
        assert_eq!(graph.node(root).unwrap().children.len(), 2);
        assert_eq!(graph.view_box(), Some(Rect::new(0.0, 0.0, 40.0, 20.0)));
    }

    #[test]
    fn rejects_bad_view_box() {
        assert!(parse_view_box("0 0 0 10").is_none());
        assert!(parse_view_box("0 0 ten 10").is_none());
        assert!(parse_view_box("0 0 10").is_none());
    }
}
