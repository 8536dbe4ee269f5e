use std::collections::HashMap;

use super::{LayoutProbe, Rect, ViewportTransform};
use crate::scheme::{NodeId, SceneGraph};

/// Расчёт раскладки без браузера: координаты схемы -> экранные
/// через подгонку поверхности и внешний zoom/pan.
///
/// Прямоугольники мест снимаются один раз при создании; zoom/pan меняются отдельно.
#[derive(Debug, Clone)]
pub struct StaticViewport {
    origin: (f64, f64),
    fit_scale: f64,
    surface: (f64, f64),
    zoom: f64,
    pan: (f64, f64),
    viewport: Rect,
    seats: HashMap<NodeId, Rect>,
    tooltip_width: Option<f64>,
}

impl StaticViewport {
    pub fn new(scene: &SceneGraph, viewport: Rect) -> Self {
        let origin = scene.view_box().map_or((0.0, 0.0), |vb| (vb.x, vb.y));
        let (fit_scale, surface) = match (scene.fit(), scene.intrinsic_size()) {
            (Some(fit), _) => (fit.scale, (fit.width, fit.height)),
            (None, Some(size)) => (1.0, (size.width, size.height)),
            (None, None) => (1.0, (0.0, 0.0)),
        };

        let seats = scene
            .seats()
            .iter()
            .filter_map(|&id| scene.bounds(id).map(|rect| (id, rect)))
            .collect();

        Self {
            origin,
            fit_scale,
            surface,
            zoom: 1.0,
            pan: (0.0, 0.0),
            viewport,
            seats,
            tooltip_width: None,
        }
    }

    pub fn set_scale(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan.0 += dx;
        self.pan.1 += dy;
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    pub fn set_tooltip_width(&mut self, width: Option<f64>) {
        self.tooltip_width = width;
    }

    fn to_screen(&self, rect: &Rect) -> Rect {
        let k = self.fit_scale * self.zoom;
        rect.translate(-self.origin.0, -self.origin.1)
            .scale(k)
            .translate(self.pan.0, self.pan.1)
    }
}

impl ViewportTransform for StaticViewport {
    fn scale(&self) -> f64 {
        self.zoom
    }

    fn viewport_rect(&self) -> Rect {
        self.viewport
    }
}

impl LayoutProbe for StaticViewport {
    fn surface_rect(&self) -> Rect {
        Rect::new(
            self.pan.0,
            self.pan.1,
            self.surface.0 * self.zoom,
            self.surface.1 * self.zoom,
        )
    }

    fn node_rect(&self, node: NodeId) -> Option<Rect> {
        self.seats.get(&node).map(|rect| self.to_screen(rect))
    }

    fn tooltip_width(&self) -> Option<f64> {
        self.tooltip_width
    }
}
