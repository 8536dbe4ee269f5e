use std::collections::BTreeMap;

use super::{SeatSurface, SeatView};
use crate::scheme::NodeId;

/// Место без отрисовки: только логические атрибуты.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessSeat {
    attrs: BTreeMap<String, String>,
}

impl HeadlessSeat {
    pub fn new(category: &str, row: Option<&str>, seat: Option<&str>) -> Self {
        let mut this = Self::default();
        this.set("category", Some(category));
        this.set("row", row);
        this.set("seat", seat);
        this
    }
}

impl SeatView for HeadlessSeat {
    fn get(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }

    fn set(&mut self, attr: &str, value: Option<&str>) {
        match value {
            Some(value) => {
                self.attrs.insert(attr.to_string(), value.to_string());
            }
            None => {
                self.attrs.remove(attr);
            }
        }
    }
}

/// Поверхность для тестов и серверного расчёта: `NodeId` - индекс места.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessSurface {
    seats: Vec<HeadlessSeat>,
}

impl HeadlessSurface {
    pub fn new(seats: Vec<HeadlessSeat>) -> Self {
        Self { seats }
    }

    pub fn from_seats(seats: &[(&str, Option<&str>, Option<&str>)]) -> Self {
        Self::new(
            seats
                .iter()
                .map(|&(category, row, seat)| HeadlessSeat::new(category, row, seat))
                .collect(),
        )
    }
}

impl SeatSurface for HeadlessSurface {
    type Seat = HeadlessSeat;

    fn seat_nodes(&self) -> Vec<NodeId> {
        (0..self.seats.len()).map(NodeId).collect()
    }

    fn seat(&self, id: NodeId) -> Option<&HeadlessSeat> {
        self.seats.get(id.0)
    }

    fn seat_mut(&mut self, id: NodeId) -> Option<&mut HeadlessSeat> {
        self.seats.get_mut(id.0)
    }
}
