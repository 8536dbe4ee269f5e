//! scheme
//!
//! Нормализатор разметки схемы зала.
//!
//! 1.  **parse**: сырой SVG -> собственное дерево сцены (`SceneGraph`).
//! 2.  **annotate**: каждому узлу с `data-category` назначается ключ места (id) и класс `svg-seat`.
//! 3.  **defs**: вставка галочек для мест/категорий и блока стилей по цветам категорий.
//! 4.  **layout**: подгонка поверхности под вьюпорт или ширину узкого окна.
//!
//! Битая или пустая разметка даёт пустую сцену, а не ошибку.

pub mod bounds;
pub mod defs;
pub mod layout;
pub mod parse;
pub mod render;
pub mod seat;

pub use layout::{FitRequest, SurfaceFit};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::error::SchemeError;
use crate::geometry::{BoundsAcc, Rect, Size};
use crate::models::{Category, SeatKey};

pub const SEAT_CLASS: &str = "svg-seat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl SceneNode {
    pub fn element(tag: &str, attrs: Vec<(String, String)>) -> Self {
        Self {
            kind: NodeKind::Element { tag: tag.to_string(), attrs },
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self { kind: NodeKind::Text(text.to_string()), parent: None, children: Vec::new() }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.kind {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => {
                    if existing != value {
                        *existing = value.to_string();
                    }
                }
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.kind {
            attrs.retain(|(key, _)| key != name);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr("class", &classes);
    }
}

/// Разобранная и аннотированная схема. Структуру меняет только нормализатор,
/// реестр мест трогает лишь атрибуты узлов-мест.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    root: Option<NodeId>,
    seats: Vec<NodeId>,
    view_box: Option<Rect>,
    fit: Option<SurfaceFit>,
}

impl SceneGraph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    /// Узлы-места (нумерованные и зоны) в порядке документа.
    pub fn seats(&self) -> &[NodeId] {
        &self.seats
    }

    pub fn view_box(&self) -> Option<Rect> {
        self.view_box
    }

    pub fn fit(&self) -> Option<SurfaceFit> {
        self.fit
    }

    pub(crate) fn push(&mut self, mut node: SceneNode, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = parent;
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.root = Some(id),
        }
        id
    }

    pub(crate) fn insert_child(&mut self, parent: NodeId, index: usize, mut node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(node);
        let children = &mut self.nodes[parent.0].children;
        children.insert(index.min(children.len()), id);
        id
    }

    /// Первый потомок-элемент с данным тегом.
    pub fn find_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).and_then(SceneNode::tag) == Some(tag))
    }

    /// Поиск элемента по id в порядке документа.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root?)
            .into_iter()
            .find(|&node| self.node(node).and_then(|n| n.attr("id")) == Some(id))
    }

    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Габариты узла в пользовательских координатах схемы (с учётом transform предков).
    pub fn bounds(&self, id: NodeId) -> Option<Rect> {
        bounds::node_bounds(self, id)
    }

    /// Габариты всего содержимого схемы; при пустом содержимом - viewBox.
    pub fn scene_box(&self) -> Option<Rect> {
        let root = self.root?;
        let mut acc = BoundsAcc::default();
        for &child in &self.node(root)?.children {
            if let Some(rect) = self.bounds(child) {
                acc.rect(&rect);
            }
        }
        acc.finish().or(self.view_box)
    }

    /// Рамка поверхности в координатах схемы: viewBox, иначе width/height корня от нуля.
    /// В ней же считаются якоря тултипа, поэтому счётчики меряются от неё.
    pub fn surface_frame(&self) -> Option<Rect> {
        if let Some(vb) = self.view_box {
            return Some(vb);
        }
        self.intrinsic_size()
            .map(|size| Rect::new(0.0, 0.0, size.width, size.height))
            .or_else(|| self.scene_box())
    }

    /// Собственный размер схемы: viewBox, иначе атрибуты width/height корня.
    pub fn intrinsic_size(&self) -> Option<Size> {
        if let Some(vb) = self.view_box {
            return Some(vb.size());
        }
        let root = self.node(self.root?)?;
        let width = root.attr("width").and_then(bounds::parse_length)?;
        let height = root.attr("height").and_then(bounds::parse_length)?;
        let size = Size::new(width, height);
        (!size.is_empty()).then_some(size)
    }

    pub fn to_svg(&self) -> String {
        render::to_svg(self)
    }
}

/// Собрать сцену из сырой разметки. Повторный вызов с новой разметкой
/// полностью заменяет прежнюю сцену; одинаковый вход даёт одинаковую сцену.
pub fn normalize(markup: &str, categories: &[Category], request: &FitRequest) -> SceneGraph {
    let mut graph = match parse::parse(markup) {
        Ok(graph) => graph,
        Err(SchemeError::Empty) => {
            debug!("Scheme markup is empty, rendering nothing");
            return SceneGraph::empty();
        }
        Err(e) => {
            warn!("Failed to parse scheme markup: {}", e);
            return SceneGraph::empty();
        }
    };

    annotate_seats(&mut graph);
    defs::inject_markers(&mut graph);
    defs::inject_styles(&mut graph, categories);

    graph.fit = graph
        .intrinsic_size()
        .and_then(|size| layout::fit_surface(size, request));

    info!(
        "Scheme normalized: {} nodes, {} seats, fit {:?}",
        graph.nodes.len(),
        graph.seats.len(),
        graph.fit
    );
    graph
}

fn annotate_seats(graph: &mut SceneGraph) {
    let Some(root) = graph.root else { return };
    let mut seen = HashSet::new();
    let mut seats = Vec::new();

    for id in graph.descendants(root) {
        let Some(node) = graph.node_mut(id) else { continue };
        let Some(category) = node.attr("data-category").map(str::to_string) else {
            continue;
        };
        if category.trim().is_empty() {
            continue;
        }

        let row = node.attr("data-row").map(str::to_string);
        let seat = node.attr("data-seat").map(str::to_string);
        let key = SeatKey::new(&category, row.as_deref(), seat.as_deref());
        let is_zone = key == SeatKey::zone(&category);

        if !is_zone && !seen.insert(key.clone()) {
            warn!("Duplicate seat key {} in scheme, later node keeps its markup id", key);
        } else {
            node.set_attr("id", key.as_str());
        }
        node.add_class(SEAT_CLASS);
        seats.push(id);
    }

    graph.seats = seats;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEME: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 200 100" width="400" height="200">
        <g id="hall">
            <rect data-category="vip" data-row="1" data-seat="1" x="10" y="10" width="8" height="8"/>
            <rect class="seat" data-category="vip" data-row="1" data-seat="2" x="20" y="10" width="8" height="8"/>
            <path data-category="dancefloor" d="M 50 50 L 150 50 L 150 90 L 50 90 Z"/>
        </g>
    </svg>"##;

    fn categories() -> Vec<Category> {
        vec![Category {
            value: "vip".into(),
            name: "VIP".into(),
            color: "#e74c3c".into(),
            icon: None,
        }]
    }

    #[test]
    fn annotates_seat_keys_and_classes() {
        let graph = normalize(SCHEME, &categories(), &FitRequest::default());
        assert_eq!(graph.seats().len(), 3);
        let ids: Vec<_> = graph
            .seats()
            .iter()
            .map(|&id| graph.node(id).unwrap().attr("id").unwrap().to_string())
            .collect();
        assert_eq!(ids, ["seat-vip-1-1", "seat-vip-1-2", "seat-dancefloor"]);
        assert!(graph.node(graph.seats()[1]).unwrap().has_class("seat"));
        assert!(graph.node(graph.seats()[1]).unwrap().has_class(SEAT_CLASS));
    }

    #[test]
    fn malformed_or_empty_markup_yields_empty_scene() {
        assert!(normalize("", &categories(), &FitRequest::default()).is_empty());
        assert!(normalize("<svg><g></svg>", &categories(), &FitRequest::default()).is_empty());
        assert!(normalize("<html/>", &categories(), &FitRequest::default()).is_empty());
    }

    #[test]
    fn normalizing_same_markup_is_idempotent() {
        let request = FitRequest { width: Some(800.0), height: Some(600.0), ..FitRequest::default() };
        let a = normalize(SCHEME, &categories(), &request);
        let b = normalize(SCHEME, &categories(), &request);
        assert_eq!(a, b);
        assert_eq!(a.to_svg(), b.to_svg());
    }

    #[test]
    fn editor_export_with_doctype_keeps_seats() {
        let markup = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" \
             \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n{SCHEME}"
        );
        let graph = normalize(&markup, &categories(), &FitRequest::default());
        assert!(!graph.is_empty());
        assert_eq!(graph.seats().len(), 3);
    }

    #[test]
    fn surface_frame_prefers_view_box() {
        let graph = normalize(SCHEME, &categories(), &FitRequest::default());
        assert_eq!(graph.surface_frame(), Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
    }

    #[test]
    fn scene_box_covers_content() {
        let graph = normalize(SCHEME, &categories(), &FitRequest::default());
        let scene = graph.scene_box().unwrap();
        assert_eq!(scene, Rect::from_corners(10.0, 10.0, 150.0, 90.0));
        assert_eq!(graph.intrinsic_size(), Some(Size::new(200.0, 100.0)));
    }
}
