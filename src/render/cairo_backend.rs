use cairo::{Context, Format, ImageSurface};
use pango::FontDescription;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::core::{ChartKind, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{
    Color, RasterSurface, RectPrimitive, RenderFrame, Renderer, SurfaceFactory, TextHAlign,
    WedgePrimitive,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CairoRenderStats {
    pub rects_drawn: usize,
    pub wedges_drawn: usize,
    pub polylines_drawn: usize,
    pub lines_drawn: usize,
    pub texts_drawn: usize,
}

/// Cairo + Pango + PangoCairo surface with full text rendering.
///
/// Cairo image surfaces cannot leave the thread that created them, so every
/// paint draws into a fresh `ImageSurface` and keeps the PNG bytes.
#[derive(Debug)]
pub struct CairoSurface {
    viewport: Viewport,
    png: Option<Vec<u8>>,
    last_stats: CairoRenderStats,
}

impl CairoSurface {
    pub fn new(viewport: Viewport) -> ChartResult<Self> {
        if !viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        Ok(Self {
            viewport,
            png: None,
            last_stats: CairoRenderStats::default(),
        })
    }

    #[must_use]
    pub fn last_stats(&self) -> CairoRenderStats {
        self.last_stats
    }

    fn paint(&self, frame: &RenderFrame) -> ChartResult<(Vec<u8>, CairoRenderStats)> {
        let width = i32::try_from(self.viewport.width)
            .map_err(|_| ChartError::InvalidData("surface width exceeds i32".to_owned()))?;
        let height = i32::try_from(self.viewport.height)
            .map_err(|_| ChartError::InvalidData("surface height exceeds i32".to_owned()))?;
        let surface = ImageSurface::create(Format::ARgb32, width, height)
            .map_err(|err| map_backend_error("failed to create cairo surface", err))?;
        let context = Context::new(&surface)
            .map_err(|err| map_backend_error("failed to create cairo context", err))?;

        apply_color(&context, frame.background);
        context
            .paint()
            .map_err(|err| map_backend_error("failed to clear surface", err))?;

        let mut stats = CairoRenderStats::default();

        for rect in &frame.rects {
            append_rect_path(&context, *rect);
            apply_color(&context, rect.fill_color);
            if rect.border_width > 0.0 {
                context
                    .fill_preserve()
                    .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
                apply_color(&context, rect.border_color);
                context.set_line_width(rect.border_width);
                context
                    .stroke()
                    .map_err(|err| map_backend_error("failed to stroke rectangle border", err))?;
            } else {
                context
                    .fill()
                    .map_err(|err| map_backend_error("failed to fill rectangle", err))?;
            }
            stats.rects_drawn += 1;
        }

        for wedge in &frame.wedges {
            append_wedge_path(&context, *wedge);
            apply_color(&context, wedge.fill_color);
            context
                .fill()
                .map_err(|err| map_backend_error("failed to fill wedge", err))?;
            stats.wedges_drawn += 1;
        }

        for polyline in &frame.polylines {
            apply_color(&context, polyline.color);
            context.set_line_width(polyline.stroke_width);
            let (first_x, first_y) = polyline.points[0];
            context.move_to(first_x, first_y);
            for (x, y) in &polyline.points[1..] {
                context.line_to(*x, *y);
            }
            context
                .stroke()
                .map_err(|err| map_backend_error("failed to stroke polyline", err))?;
            stats.polylines_drawn += 1;
        }

        for line in &frame.lines {
            apply_color(&context, line.color);
            context.set_line_width(line.stroke_width);
            context.move_to(line.x1, line.y1);
            context.line_to(line.x2, line.y2);
            context
                .stroke()
                .map_err(|err| map_backend_error("failed to stroke line", err))?;
            stats.lines_drawn += 1;
        }

        for text in &frame.texts {
            let layout = pangocairo::functions::create_layout(&context);
            let font_description =
                FontDescription::from_string(&format!("Sans {}px", text.font_size_px));
            layout.set_font_description(Some(&font_description));
            layout.set_text(&text.text);

            let (text_width, _text_height) = layout.pixel_size();
            let x = match text.h_align {
                TextHAlign::Left => text.x,
                TextHAlign::Center => text.x - f64::from(text_width) / 2.0,
                TextHAlign::Right => text.x - f64::from(text_width),
            };

            apply_color(&context, text.color);
            context.move_to(x, text.y);
            pangocairo::functions::show_layout(&context, &layout);
            stats.texts_drawn += 1;
        }

        drop(context);
        surface.flush();

        let mut png = Vec::new();
        surface
            .write_to_png(&mut png)
            .map_err(|err| ChartError::Backend(format!("failed to encode png: {err}")))?;
        Ok((png, stats))
    }
}

impl Renderer for CairoSurface {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()> {
        frame.validate()?;
        if frame.viewport != self.viewport {
            return Err(ChartError::InvalidData(
                "frame viewport does not match surface".to_owned(),
            ));
        }
        let (png, stats) = self.paint(frame)?;
        self.png = Some(png);
        self.last_stats = stats;
        Ok(())
    }
}

impl RasterSurface for CairoSurface {
    fn backend_name(&self) -> &'static str {
        "cairo+pango+pangocairo"
    }

    fn is_painted(&self) -> bool {
        self.png.is_some()
    }

    fn encode_png(&self) -> ChartResult<Vec<u8>> {
        self.png
            .clone()
            .ok_or_else(|| ChartError::Backend("surface has not been painted".to_owned()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CairoSurfaceFactory;

impl SurfaceFactory for CairoSurfaceFactory {
    fn create_surface(
        &self,
        _kind: ChartKind,
        viewport: Viewport,
    ) -> ChartResult<Box<dyn RasterSurface>> {
        Ok(Box::new(CairoSurface::new(viewport)?))
    }
}

fn apply_color(context: &Context, color: Color) {
    context.set_source_rgba(color.red, color.green, color.blue, color.alpha);
}

fn append_rect_path(context: &Context, rect: RectPrimitive) {
    if rect.corner_radius <= 0.0 {
        context.rectangle(rect.x, rect.y, rect.width, rect.height);
        return;
    }

    let radius = rect
        .corner_radius
        .min(rect.width * 0.5)
        .min(rect.height * 0.5);
    let left = rect.x;
    let top = rect.y;
    let right = rect.x + rect.width;
    let bottom = rect.y + rect.height;

    context.new_sub_path();
    context.arc(right - radius, top + radius, radius, -FRAC_PI_2, 0.0);
    context.arc(right - radius, bottom - radius, radius, 0.0, FRAC_PI_2);
    context.arc(left + radius, bottom - radius, radius, FRAC_PI_2, PI);
    context.arc(left + radius, top + radius, radius, PI, PI + FRAC_PI_2);
    context.close_path();
}

// Wedge angles start at twelve o'clock; cairo angles start at three o'clock.
fn append_wedge_path(context: &Context, wedge: WedgePrimitive) {
    let start = wedge.start_angle - FRAC_PI_2;
    let end = wedge.end_angle - FRAC_PI_2;

    context.new_sub_path();
    context.arc(wedge.center_x, wedge.center_y, wedge.outer_radius, start, end);
    if wedge.inner_radius > 0.0 {
        context.arc_negative(wedge.center_x, wedge.center_y, wedge.inner_radius, end, start);
    } else {
        context.line_to(wedge.center_x, wedge.center_y);
    }
    context.close_path();
}

fn map_backend_error(prefix: &str, err: cairo::Error) -> ChartError {
    ChartError::Backend(format!("{prefix}: {err}"))
}
