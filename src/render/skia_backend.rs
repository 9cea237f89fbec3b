use std::f64::consts::PI;

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use crate::core::{ChartKind, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{
    Color, RasterSurface, RectPrimitive, RenderFrame, Renderer, SurfaceFactory, WedgePrimitive,
};

// Maximum angle covered by one straight segment when flattening arcs.
const ARC_SEGMENT_RADIANS: f64 = PI / 48.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkiaRenderStats {
    pub rects_drawn: usize,
    pub wedges_drawn: usize,
    pub polylines_drawn: usize,
    pub lines_drawn: usize,
    /// Text primitives are laid out by the frame builder but not rasterized:
    /// tiny-skia has no text shaping. Use the Cairo backend for labelled output.
    pub texts_skipped: usize,
}

/// Headless tiny-skia surface. Needs no system libraries.
#[derive(Debug)]
pub struct PixmapSurface {
    viewport: Viewport,
    pixmap: Option<Pixmap>,
    last_stats: SkiaRenderStats,
}

impl PixmapSurface {
    pub fn new(viewport: Viewport) -> ChartResult<Self> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            viewport,
            pixmap: None,
            last_stats: SkiaRenderStats::default(),
        })
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    #[must_use]
    pub fn last_stats(&self) -> SkiaRenderStats {
        self.last_stats
    }

    /// Premultiplied RGBA bytes of the last painted frame.
    #[must_use]
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixmap.as_ref().map(Pixmap::data)
    }
}

impl Renderer for PixmapSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        if frame.viewport != self.viewport {
            return Err(ChartError::InvalidData(format!(
                "frame viewport {}x{} does not match surface {}x{}",
                frame.viewport.width,
                frame.viewport.height,
                self.viewport.width,
                self.viewport.height
            )));
        }

        let mut pixmap = Pixmap::new(self.viewport.width, self.viewport.height)
            .ok_or_else(|| ChartError::Backend("failed to allocate pixmap".to_owned()))?;
        pixmap.fill(skia_color(frame.background)?);

        let mut stats = SkiaRenderStats::default();

        for rect in &frame.rects {
            fill_rect(&mut pixmap, *rect)?;
            stats.rects_drawn += 1;
        }

        for wedge in &frame.wedges {
            let path = wedge_path(*wedge)
                .ok_or_else(|| ChartError::Backend("failed to build wedge path".to_owned()))?;
            pixmap.fill_path(
                &path,
                &paint_for(wedge.fill_color)?,
                FillRule::Winding,
                Transform::identity(),
                None,
            );
            stats.wedges_drawn += 1;
        }

        for polyline in &frame.polylines {
            let mut builder = PathBuilder::new();
            let (first_x, first_y) = polyline.points[0];
            builder.move_to(first_x as f32, first_y as f32);
            for (x, y) in &polyline.points[1..] {
                builder.line_to(*x as f32, *y as f32);
            }
            if let Some(path) = builder.finish() {
                stroke_path(&mut pixmap, &path, polyline.stroke_width, polyline.color)?;
                stats.polylines_drawn += 1;
            }
        }

        for line in &frame.lines {
            let mut builder = PathBuilder::new();
            builder.move_to(line.x1 as f32, line.y1 as f32);
            builder.line_to(line.x2 as f32, line.y2 as f32);
            if let Some(path) = builder.finish() {
                stroke_path(&mut pixmap, &path, line.stroke_width, line.color)?;
                stats.lines_drawn += 1;
            }
        }

        stats.texts_skipped = frame.texts.len();
        self.pixmap = Some(pixmap);
        self.last_stats = stats;
        Ok(())
    }
}

impl RasterSurface for PixmapSurface {
    fn backend_name(&self) -> &'static str {
        "tiny-skia"
    }

    fn is_painted(&self) -> bool {
        self.pixmap.is_some()
    }

    fn encode_png(&self) -> ChartResult<Vec<u8>> {
        let pixmap = self
            .pixmap
            .as_ref()
            .ok_or_else(|| ChartError::Backend("surface has not been painted".to_owned()))?;
        pixmap
            .encode_png()
            .map_err(|err| ChartError::Backend(format!("failed to encode png: {err}")))
    }
}

/// Default factory: one [`PixmapSurface`] per chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixmapSurfaceFactory;

impl SurfaceFactory for PixmapSurfaceFactory {
    fn create_surface(
        &self,
        _kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        Ok(Box::new(PixmapSurface::new(viewport)?))
    }
}

fn skia_color(color: Color) -> ChartResult<tiny_skia::Color> {
    tiny_skia::Color::from_rgba(
        color.red as f32,
        color.green as f32,
        color.blue as f32,
        color.alpha as f32,
    )
    .ok_or_else(|| ChartError::InvalidData("color channels must be in [0, 1]".to_owned()))
}

fn paint_for(color: Color) -> ChartResult<Paint<'static>> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color)?);
    paint.anti_alias = true;
    Ok(paint)
}

fn stroke_path(
    pixmap: &mut Pixmap,
    path: &tiny_skia::Path,
    width: f64,
    color: Color,
) -> ChartResult<()> {
    let stroke = Stroke {
        width: width as f32,
        ..Stroke::default()
    };
    pixmap.stroke_path(path, &paint_for(color)?, &stroke, Transform::identity(), None);
    Ok(())
}

fn fill_rect(pixmap: &mut Pixmap, rect: RectPrimitive) -> ChartResult<()> {
    // Zero-sized rects are valid frame content but have nothing to fill.
    let Some(bounds) = Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    ) else {
        return Ok(());
    };

    let path = if rect.corner_radius > 0.0 {
        rounded_rect_path(rect)
    } else {
        Some(PathBuilder::from_rect(bounds))
    };
    let Some(path) = path else {
        return Ok(());
    };

    pixmap.fill_path(
        &path,
        &paint_for(rect.fill_color)?,
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    if rect.border_width > 0.0 {
        stroke_path(pixmap, &path, rect.border_width, rect.border_color)?;
    }
    Ok(())
}

fn rounded_rect_path(rect: RectPrimitive) -> Option<tiny_skia::Path> {
    let radius = rect
        .corner_radius
        .min(rect.width * 0.5)
        .min(rect.height * 0.5) as f32;
    let left = rect.x as f32;
    let top = rect.y as f32;
    let right = (rect.x + rect.width) as f32;
    let bottom = (rect.y + rect.height) as f32;

    let mut builder = PathBuilder::new();
    builder.move_to(left + radius, top);
    builder.line_to(right - radius, top);
    builder.quad_to(right, top, right, top + radius);
    builder.line_to(right, bottom - radius);
    builder.quad_to(right, bottom, right - radius, bottom);
    builder.line_to(left + radius, bottom);
    builder.quad_to(left, bottom, left, bottom - radius);
    builder.line_to(left, top + radius);
    builder.quad_to(left, top, left + radius, top);
    builder.close();
    builder.finish()
}

fn wedge_path(wedge: WedgePrimitive) -> Option<tiny_skia::Path> {
    let sweep = wedge.end_angle - wedge.start_angle;
    let segments = (sweep / ARC_SEGMENT_RADIANS).ceil().max(1.0) as usize;
    let step = sweep / segments as f64;

    let mut builder = PathBuilder::new();
    let (x, y) = wedge.point_at(wedge.outer_radius, wedge.start_angle);
    builder.move_to(x as f32, y as f32);
    for index in 1..=segments {
        let (x, y) = wedge.point_at(wedge.outer_radius, wedge.start_angle + step * index as f64);
        builder.line_to(x as f32, y as f32);
    }

    if wedge.inner_radius > 0.0 {
        for index in (0..=segments).rev() {
            let (x, y) =
                wedge.point_at(wedge.inner_radius, wedge.start_angle + step * index as f64);
            builder.line_to(x as f32, y as f32);
        }
    } else {
        builder.line_to(wedge.center_x as f32, wedge.center_y as f32);
    }
    builder.close();
    builder.finish()
}
