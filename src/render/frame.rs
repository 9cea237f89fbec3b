use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::{
    Color, LinePrimitive, PolylinePrimitive, RectPrimitive, TextPrimitive, WedgePrimitive,
};

/// Backend-agnostic scene for one chart draw pass.
///
/// Backends paint `background`, then rects, wedges, polylines, lines and
/// texts in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub background: Color,
    pub rects: Vec<RectPrimitive>,
    pub wedges: Vec<WedgePrimitive>,
    pub polylines: Vec<PolylinePrimitive>,
    pub lines: Vec<LinePrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl RenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            background: Color::rgb(1.0, 1.0, 1.0),
            rects: Vec::new(),
            wedges: Vec::new(),
            polylines: Vec::new(),
            lines: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    #[must_use]
    pub fn with_line(mut self, line: LinePrimitive) -> Self {
        self.lines.push(line);
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: TextPrimitive) -> Self {
        self.texts.push(text);
        self
    }

    #[must_use]
    pub fn with_rect(mut self, rect: RectPrimitive) -> Self {
        self.rects.push(rect);
        self
    }

    #[must_use]
    pub fn with_wedge(mut self, wedge: WedgePrimitive) -> Self {
        self.wedges.push(wedge);
        self
    }

    #[must_use]
    pub fn with_polyline(mut self, polyline: PolylinePrimitive) -> Self {
        self.polylines.push(polyline);
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }

        self.background.validate()?;
        for rect in &self.rects {
            rect.validate()?;
        }
        for wedge in &self.wedges {
            wedge.validate()?;
        }
        for polyline in &self.polylines {
            polyline.validate()?;
        }
        for line in &self.lines {
            line.validate()?;
        }
        for text in &self.texts {
            text.validate()?;
        }

        Ok(())
    }

    #[must_use]
    pub fn primitive_count(&self) -> usize {
        self.rects.len()
            + self.wedges.len()
            + self.polylines.len()
            + self.lines.len()
            + self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }
}
