mod chart_frame;
mod chart_style;
mod frame;
mod null_renderer;
mod primitives;
mod skia_backend;

pub use chart_frame::{build_chart_frame, format_compact};
pub use chart_style::ChartStyle;
pub use frame::RenderFrame;
pub use null_renderer::{NullRenderer, NullSurfaceFactory};
pub use primitives::{
    Color, LinePrimitive, PolylinePrimitive, RectPrimitive, TextHAlign, TextPrimitive,
    WedgePrimitive,
};
pub use skia_backend::{PixmapSurface, PixmapSurfaceFactory, SkiaRenderStats};

use crate::core::{ChartKind, Viewport};
use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized, deterministic `RenderFrame` so
/// drawing code remains isolated from chart datasets and capture scheduling.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}

/// Off-screen drawing surface whose pixels can be read back after a paint.
pub trait RasterSurface: Renderer + Send {
    fn backend_name(&self) -> &'static str;

    /// True once a frame has been painted successfully.
    fn is_painted(&self) -> bool;

    /// Encodes the last painted frame as PNG bytes.
    fn encode_png(&self) -> ChartResult<Vec<u8>>;
}

/// Creates one surface per mounted chart.
pub trait SurfaceFactory: Send + Sync {
    fn create_surface(
        &self,
        kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>>;
}

#[cfg(feature = "cairo-backend")]
mod cairo_backend;
#[cfg(feature = "cairo-backend")]
pub use cairo_backend::{CairoRenderStats, CairoSurface, CairoSurfaceFactory};
