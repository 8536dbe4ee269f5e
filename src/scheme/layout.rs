use serde::{Deserialize, Serialize};

use crate::config::SchemeConfig;
use crate::geometry::Size;

/// Доступная область для поверхности схемы.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRequest {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub window_width: Option<f64>,
    pub narrow_breakpoint: f64,
}

impl Default for FitRequest {
    fn default() -> Self {
        Self { width: None, height: None, window_width: None, narrow_breakpoint: 1024.0 }
    }
}

impl From<&SchemeConfig> for FitRequest {
    fn from(config: &SchemeConfig) -> Self {
        Self {
            width: config.viewport_width,
            height: config.viewport_height,
            window_width: config.window_width,
            narrow_breakpoint: config.narrow_breakpoint,
        }
    }
}

/// Размер поверхности после подгонки и коэффициент относительно собственного размера схемы.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceFit {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

/// Вписать схему с сохранением пропорций: по высоте, если доступная область
/// "шире" схемы, иначе по ширине. Без явной ширины на узком окне берётся ширина окна.
pub fn fit_surface(intrinsic: Size, request: &FitRequest) -> Option<SurfaceFit> {
    if intrinsic.is_empty() {
        return None;
    }

    let positive = |v: Option<f64>| v.filter(|v| v.is_finite() && *v > 0.0);
    let height = positive(request.height);
    let width = positive(request.width).or_else(|| {
        positive(request.window_width).filter(|w| *w < request.narrow_breakpoint)
    });

    let ratio = intrinsic.width / intrinsic.height;
    let (width, height) = match (width, height) {
        (Some(w), Some(h)) if w / h > ratio => (ratio * h, h),
        (Some(w), _) => (w, w / ratio),
        (None, Some(h)) => (ratio * h, h),
        (None, None) => (intrinsic.width, intrinsic.height),
    };

    Some(SurfaceFit { width, height, scale: width / intrinsic.width })
}
