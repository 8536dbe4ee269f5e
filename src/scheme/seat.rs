//! SVG-бэкенд для `SeatView`: логические атрибуты живут в `data-*` узла сцены.

use super::defs::DIMMED_FILL;
use super::{NodeId, SceneGraph, SceneNode, SEAT_CLASS};
use crate::registry::{SeatSurface, SeatView};

fn is_seat(node: &SceneNode) -> bool {
    node.has_class(SEAT_CLASS) && node.has_attr("data-category")
}

fn data_attr(attr: &str) -> String {
    format!("data-{attr}")
}

impl SeatView for SceneNode {
    fn get(&self, attr: &str) -> Option<&str> {
        self.attr(&data_attr(attr))
    }

    fn set(&mut self, attr: &str, value: Option<&str>) {
        let name = data_attr(attr);
        match value {
            Some(value) => self.set_attr(&name, value),
            None => self.remove_attr(&name),
        }
    }

    // подсветка категории - через inline-стиль, как и раньше на странице
    fn dimmed(&self) -> bool {
        self.attr("style").is_some_and(|style| style.contains(DIMMED_FILL))
    }

    fn set_dimmed(&mut self, dimmed: bool) {
        if dimmed {
            self.set_attr("style", &format!("fill: {DIMMED_FILL}"));
        } else {
            self.remove_attr("style");
        }
    }
}

impl SeatSurface for SceneGraph {
    type Seat = SceneNode;

    fn seat_nodes(&self) -> Vec<NodeId> {
        self.seats().to_vec()
    }

    fn seat(&self, id: NodeId) -> Option<&SceneNode> {
        self.node(id).filter(|node| is_seat(node))
    }

    fn seat_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.node_mut(id).filter(|node| is_seat(node))
    }
}
