use crate::core::{ChartKind, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{RasterSurface, RenderFrame, Renderer, SurfaceFactory};

/// Surface that validates frames but keeps no pixels.
///
/// Capture treats it as a chart whose surface never became readable, which
/// makes it useful for exercising partial and total capture failures.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub last_primitive_count: usize,
    pub frames_rendered: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        self.last_primitive_count = frame.primitive_count();
        self.frames_rendered += 1;
        Ok(())
    }
}

impl RasterSurface for NullRenderer {
    fn backend_name(&self) -> &'static str {
        "null"
    }

    fn is_painted(&self) -> bool {
        false
    }

    fn encode_png(&self) -> ChartResult<Vec<u8>> {
        Err(ChartError::Backend(
            "null renderer keeps no pixels".to_owned(),
        ))
    }
}

/// Hands out [`NullRenderer`] surfaces for every chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurfaceFactory;

impl SurfaceFactory for NullSurfaceFactory {
    fn create_surface(
        &self,
        _kind: ChartKind,
        _viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        Ok(Box::new(NullRenderer::default()))
    }
}
