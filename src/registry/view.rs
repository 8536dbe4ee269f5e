use crate::scheme::NodeId;

/// Доступ к визуальному месту независимо от бэкенда отрисовки
/// (SVG-сцена, canvas, headless-двойник в тестах).
///
/// `get`/`set` работают с логическими атрибутами без префикса `data-`:
/// `category`, `row`, `seat`, `ticket-id`, `text`, `checked`, `disabled`.
pub trait SeatView {
    fn get(&self, attr: &str) -> Option<&str>;
    fn set(&mut self, attr: &str, value: Option<&str>);

    /// Зона (танцпол): нет ни ряда, ни места.
    fn is_zone(&self) -> bool {
        let blank = |v: Option<&str>| v.map_or(true, |v| v.trim().is_empty());
        blank(self.get("row")) && blank(self.get("seat"))
    }

    fn checked(&self) -> bool {
        self.get("checked").is_some()
    }

    fn disabled(&self) -> bool {
        self.get("disabled").is_some()
    }

    fn set_checked(&mut self, checked: bool) {
        self.set("checked", checked.then_some("true"));
    }

    fn set_disabled(&mut self, disabled: bool) {
        self.set("disabled", disabled.then_some("true"));
    }

    fn dimmed(&self) -> bool {
        self.get("dimmed").is_some()
    }

    fn set_dimmed(&mut self, dimmed: bool) {
        self.set("dimmed", dimmed.then_some("true"));
    }
}

/// Набор мест, к которому реестр применяет патчи.
pub trait SeatSurface {
    type Seat: SeatView;

    fn seat_nodes(&self) -> Vec<NodeId>;
    fn seat(&self, id: NodeId) -> Option<&Self::Seat>;
    fn seat_mut(&mut self, id: NodeId) -> Option<&mut Self::Seat>;
}
