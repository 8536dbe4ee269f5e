//! geometry
//!
//! Позиционирование тултипа относительно места под внешним zoom/pan.
//!
//! Движок не владеет трансформацией: он лишь читает масштаб и прямоугольники,
//! уже пересчитанные с учётом текущего zoom/pan, и переводит их в проценты
//! от поверхности схемы. Проценты не зависят от масштаба, поэтому якорь остаётся
//! валидным, пока трансформация меняется независимо.

pub mod headless;
pub mod rect;

pub use headless::StaticViewport;
pub use rect::{BoundsAcc, Rect, Size};

use serde::Serialize;
use tracing::debug;

use crate::config::TooltipConfig;
use crate::gesture::TooltipCommand;
use crate::models::TicketId;
use crate::scheme::NodeId;

/// Внешний коллаборатор zoom/pan. Движок только читает его.
pub trait ViewportTransform {
    fn scale(&self) -> f64;
    /// Прямоугольник видимой области (в тех же координатах, что и `LayoutProbe`).
    fn viewport_rect(&self) -> Rect;
}

/// Источник прямоугольников после трансформации (DOM, canvas или headless-расчёт).
pub trait LayoutProbe {
    fn surface_rect(&self) -> Rect;
    fn node_rect(&self, node: NodeId) -> Option<Rect>;
    /// Фактическая ширина отрисованного тултипа, если слой представления её знает.
    fn tooltip_width(&self) -> Option<f64> {
        None
    }
}

/// Якорь в долях поверхности, `[0, 1]` по обеим осям.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TooltipAnchor {
    pub x: f64,
    pub y: f64,
    pub flipped: bool,
}

/// Якорь тултипа за правым нижним углом места.
///
/// Возвращает `None` для поверхности нулевого размера: позиционирование
/// пропускается до следующего события, повторов внутри нет.
pub fn compute_anchor(
    node: Rect,
    surface: Rect,
    viewport: Rect,
    tooltip_width: f64,
    config: &TooltipConfig,
) -> Option<TooltipAnchor> {
    if surface.is_degenerate() || !node.x.is_finite() || !node.y.is_finite() {
        return None;
    }

    let mut dx = node.right() - surface.x;
    let dy = node.bottom() - surface.y;
    let mut flipped = false;

    if !viewport.is_degenerate() {
        // Тултип не помещается справа от места - сдвигаем влево на перелёт + отступ
        let room = viewport.right() - node.right();
        if tooltip_width > room {
            dx -= tooltip_width - room + config.edge_margin;
        }
        flipped = viewport.bottom() - node.bottom() < config.height_threshold;
    }

    Some(TooltipAnchor {
        x: (dx / surface.width).clamp(0.0, 1.0),
        y: (dy / surface.height).clamp(0.0, 1.0),
        flipped,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TooltipState {
    pub visible: bool,
    pub node: Option<NodeId>,
    pub ticket_id: Option<TicketId>,
    pub x_percent: f64,
    pub y_percent: f64,
    pub hide_delay_ms: u64,
    pub flipped: bool,
    /// Масштаб трансформации на момент расчёта (для компенсации размера тултипа).
    pub scale: f64,
}

impl Default for TooltipState {
    fn default() -> Self {
        Self {
            visible: false,
            node: None,
            ticket_id: None,
            x_percent: 0.0,
            y_percent: 0.0,
            hide_delay_ms: 0,
            flipped: false,
            scale: 1.0,
        }
    }
}

impl TooltipState {
    pub fn css_left(&self) -> String {
        format!("{:.2}%", self.x_percent * 100.0)
    }

    pub fn css_top(&self) -> String {
        format!("{:.2}%", self.y_percent * 100.0)
    }
}

/// Единственный писатель `TooltipState`.
#[derive(Debug, Clone)]
pub struct TooltipPositioner {
    config: TooltipConfig,
    state: TooltipState,
}

impl TooltipPositioner {
    pub fn new(config: TooltipConfig) -> Self {
        Self { config, state: TooltipState::default() }
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    /// Применить команду контроллера жестов. Якорь считается заново на каждый показ.
    pub fn apply(
        &mut self,
        command: &TooltipCommand,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) {
        match command {
            TooltipCommand::Show { node, ticket_id } => {
                self.show(*node, ticket_id.clone(), layout, viewport);
            }
            TooltipCommand::ArmHide { delay } => {
                self.state.hide_delay_ms = delay.as_millis() as u64;
            }
            TooltipCommand::Hide { delay } => {
                self.state.visible = false;
                self.state.hide_delay_ms = delay.as_millis() as u64;
            }
        }
    }

    /// Перерисовать открытый тултип после перепривязки билетов.
    /// Взведённая задержка скрытия сохраняется: таймер контроллера продолжает идти.
    pub fn refresh(
        &mut self,
        ticket_id: Option<TicketId>,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) {
        if let (true, Some(node)) = (self.state.visible, self.state.node) {
            let armed = self.state.hide_delay_ms;
            self.show(node, ticket_id, layout, viewport);
            self.state.hide_delay_ms = armed;
        }
    }

    fn show(
        &mut self,
        node: NodeId,
        ticket_id: Option<TicketId>,
        layout: &dyn LayoutProbe,
        viewport: &dyn ViewportTransform,
    ) {
        let Some(node_rect) = layout.node_rect(node) else {
            debug!("Tooltip skipped, node {:?} has no layout box", node);
            return;
        };
        let tooltip_width = layout.tooltip_width().unwrap_or(self.config.default_width);
        let Some(anchor) = compute_anchor(
            node_rect,
            layout.surface_rect(),
            viewport.viewport_rect(),
            tooltip_width,
            &self.config,
        ) else {
            debug!("Tooltip skipped, surface is not laid out yet");
            return;
        };

        self.state = TooltipState {
            visible: true,
            node: Some(node),
            ticket_id,
            x_percent: anchor.x,
            y_percent: anchor.y,
            hide_delay_ms: 0,
            flipped: anchor.flipped,
            scale: viewport.scale(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cfg() -> TooltipConfig {
        TooltipConfig::default()
    }

    #[test]
    fn anchors_past_bottom_right_corner() {
        let surface = Rect::new(0.0, 0.0, 1000.0, 500.0);
        let viewport = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let node = Rect::new(100.0, 100.0, 20.0, 20.0);
        let anchor = compute_anchor(node, surface, viewport, 200.0, &cfg()).unwrap();
        assert!((anchor.x - 0.12).abs() < 1e-9);
        assert!((anchor.y - 0.24).abs() < 1e-9);
        assert!(!anchor.flipped);
    }

    #[test]
    fn shifts_left_near_right_edge() {
        let surface = Rect::new(0.0, 0.0, 1000.0, 500.0);
        let viewport = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let node = Rect::new(880.0, 100.0, 20.0, 20.0);
        // справа 100px, тултипу нужно 200 -> сдвиг 100 + 10
        let anchor = compute_anchor(node, surface, viewport, 200.0, &cfg()).unwrap();
        assert!((anchor.x - 0.79).abs() < 1e-9);
    }

    #[test]
    fn flips_near_bottom_edge() {
        let surface = Rect::new(0.0, 0.0, 1000.0, 1000.0);
        let viewport = Rect::new(0.0, 0.0, 1000.0, 600.0);
        let node = Rect::new(100.0, 470.0, 20.0, 20.0);
        let anchor = compute_anchor(node, surface, viewport, 100.0, &cfg()).unwrap();
        assert!(anchor.flipped);
    }

    #[test]
    fn zero_sized_surface_is_skipped() {
        let node = Rect::new(10.0, 10.0, 5.0, 5.0);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(compute_anchor(node, Rect::default(), viewport, 100.0, &cfg()).is_none());
    }

    #[test]
    fn anchor_is_scale_invariant() {
        let viewport = Rect::new(-5000.0, -5000.0, 20000.0, 20000.0);
        let surface = Rect::new(0.0, 0.0, 400.0, 200.0);
        let node = Rect::new(40.0, 20.0, 8.0, 8.0);
        let a = compute_anchor(node, surface, viewport, 0.0, &cfg()).unwrap();
        let b = compute_anchor(node.scale(2.5), surface.scale(2.5), viewport, 0.0, &cfg()).unwrap();
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
    }

    struct Fixed;

    impl LayoutProbe for Fixed {
        fn surface_rect(&self) -> Rect {
            Rect::new(0.0, 0.0, 1000.0, 500.0)
        }

        fn node_rect(&self, _node: NodeId) -> Option<Rect> {
            Some(Rect::new(100.0, 100.0, 20.0, 20.0))
        }
    }

    impl ViewportTransform for Fixed {
        fn scale(&self) -> f64 {
            1.0
        }

        fn viewport_rect(&self) -> Rect {
            Rect::new(0.0, 0.0, 1000.0, 800.0)
        }
    }

    #[test]
    fn refresh_keeps_armed_hide_delay() {
        let mut positioner = TooltipPositioner::new(cfg());
        let show = TooltipCommand::Show { node: NodeId(1), ticket_id: Some("t-1".into()) };
        positioner.apply(&show, &Fixed, &Fixed);
        positioner.apply(&TooltipCommand::ArmHide { delay: std::time::Duration::from_millis(500) }, &Fixed, &Fixed);

        positioner.refresh(Some("t-1".into()), &Fixed, &Fixed);
        assert!(positioner.state().visible);
        assert_eq!(positioner.state().hide_delay_ms, 500);

        // новый показ сбрасывает задержку
        positioner.apply(&show, &Fixed, &Fixed);
        assert_eq!(positioner.state().hide_delay_ms, 0);
    }

    proptest! {
        #[test]
        fn anchors_stay_in_unit_square(
            sx in -500.0f64..500.0, sy in -500.0f64..500.0,
            sw in 1.0f64..2000.0, sh in 1.0f64..2000.0,
            fx in 0.0f64..1.0, fy in 0.0f64..1.0,
            nw in 0.0f64..200.0, nh in 0.0f64..200.0,
            tw in 0.0f64..600.0,
        ) {
            let surface = Rect::new(sx, sy, sw, sh);
            // узел хотя бы частично внутри поверхности
            let node = Rect::new(sx + fx * sw - nw / 2.0, sy + fy * sh - nh / 2.0, nw, nh);
            let viewport = Rect::new(sx, sy, sw, sh);
            let anchor = compute_anchor(node, surface, viewport, tw, &cfg()).unwrap();
            prop_assert!((0.0..=1.0).contains(&anchor.x));
            prop_assert!((0.0..=1.0).contains(&anchor.y));
        }
    }
}
