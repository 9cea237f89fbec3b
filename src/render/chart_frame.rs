use std::f64::consts::TAU;

use crate::core::{ChartDataset, ChartShape, PlotRect, ValueScale, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{
    ChartStyle, LinePrimitive, PolylinePrimitive, RectPrimitive, RenderFrame,
    TextHAlign, TextPrimitive, WedgePrimitive,
};

const EMPTY_LABEL: &str = "No data";
const AXIS_STROKE_PX: f64 = 1.0;
const GRID_STROKE_PX: f64 = 1.0;
const BAR_FILL_RATIO: f64 = 0.6;
const MARKER_SIZE_PX: f64 = 4.0;
const LEGEND_SWATCH_PX: f64 = 10.0;
const LINE_HEIGHT_RATIO: f64 = 1.6;
// Rough advance width of one glyph relative to font size, used for layout only.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// Lays out `dataset` as a complete chart scene for a `viewport`-sized surface.
///
/// Empty datasets still produce a drawable frame (axes or a placeholder ring
/// plus a "No data" label), so every mounted chart has something to paint.
pub fn build_chart_frame(
    dataset: &ChartDataset,
    style: &ChartStyle,
    viewport: Viewport,
) -> ChartResult<RenderFrame> {
    if !viewport.is_valid() {
        return Err(ChartError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let mut frame = RenderFrame::new(viewport).with_background(style.background);
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);
    let padding = style.padding_px;

    frame.texts.push(TextPrimitive::new(
        dataset.kind.title(),
        width * 0.5,
        padding * 0.5,
        style.title_font_size_px,
        style.text_color,
        TextHAlign::Center,
    ));

    let title_height = style.title_font_size_px * LINE_HEIGHT_RATIO;
    let label_height = style.label_font_size_px * LINE_HEIGHT_RATIO;
    let legend_entries = legend_entries(dataset);
    let legend_height = if legend_entries.is_empty() {
        0.0
    } else {
        label_height
    };

    let area = PlotRect::new(
        padding,
        padding * 0.5 + title_height,
        width - padding,
        height - padding * 0.5 - legend_height,
    );

    if area.is_drawable() {
        match dataset.shape {
            ChartShape::Bar => draw_bar_chart(&mut frame, dataset, style, area)?,
            ChartShape::Line => draw_line_chart(&mut frame, dataset, style, area)?,
            ChartShape::Doughnut => draw_doughnut_chart(&mut frame, dataset, style, area),
        }
    }

    draw_legend(&mut frame, &legend_entries, style, width, height - padding * 0.5 - legend_height);
    Ok(frame)
}

/// Compact human-readable amount: `12.5M`, `300k`, `42`.
#[must_use]
pub fn format_compact(value: f64) -> String {
    let magnitude = value.abs();
    let (scaled, suffix) = if magnitude >= 1e12 {
        (value / 1e12, "T")
    } else if magnitude >= 1e9 {
        (value / 1e9, "B")
    } else if magnitude >= 1e6 {
        (value / 1e6, "M")
    } else if magnitude >= 1e3 {
        (value / 1e3, "k")
    } else {
        (value, "")
    };

    let text = if (scaled - scaled.round()).abs() < 0.05 {
        format!("{:.0}", scaled)
    } else {
        format!("{:.1}", scaled)
    };
    format!("{text}{suffix}")
}

fn legend_entries(dataset: &ChartDataset) -> Vec<(String, usize)> {
    match dataset.shape {
        ChartShape::Doughnut => {
            let values = dataset
                .series
                .first()
                .map(|series| series.values.as_slice())
                .unwrap_or_default();
            let total: f64 = values.iter().filter(|value| **value > 0.0).sum();
            if total <= 0.0 {
                return Vec::new();
            }
            dataset
                .labels
                .iter()
                .zip(values)
                .enumerate()
                .filter(|(_, (_, value))| **value > 0.0)
                .map(|(index, (label, value))| {
                    (format!("{label} ({:.0}%)", value / total * 100.0), index)
                })
                .collect()
        }
        ChartShape::Line if !dataset.labels.is_empty() => dataset
            .series
            .iter()
            .enumerate()
            .map(|(index, series)| (series.name.clone(), index))
            .collect(),
        _ => Vec::new(),
    }
}

fn draw_legend(
    frame: &mut RenderFrame,
    entries: &[(String, usize)],
    style: &ChartStyle,
    width: f64,
    top: f64,
) {
    if entries.is_empty() {
        return;
    }

    let font = style.label_font_size_px;
    let gap = font;
    let entry_widths: Vec<f64> = entries
        .iter()
        .map(|(label, _)| {
            LEGEND_SWATCH_PX + font * 0.5 + label.chars().count() as f64 * font * GLYPH_WIDTH_RATIO
        })
        .collect();
    let total_width =
        entry_widths.iter().sum::<f64>() + gap * entries.len().saturating_sub(1) as f64;

    let mut x = ((width - total_width) * 0.5).max(style.padding_px);
    let swatch_top = top + (font * LINE_HEIGHT_RATIO - LEGEND_SWATCH_PX) * 0.5;
    for ((label, color_index), entry_width) in entries.iter().zip(entry_widths) {
        frame.rects.push(RectPrimitive::new(
            x,
            swatch_top,
            LEGEND_SWATCH_PX,
            LEGEND_SWATCH_PX,
            style.color_at(*color_index),
        ));
        frame.texts.push(TextPrimitive::new(
            label.as_str(),
            x + LEGEND_SWATCH_PX + font * 0.5,
            top,
            font,
            style.text_color,
            TextHAlign::Left,
        ));
        x += entry_width + gap;
    }
}

/// Draws the value axis, grid and tick labels; returns the plot rectangle
/// that remains for data.
fn draw_value_axis(
    frame: &mut RenderFrame,
    dataset: &ChartDataset,
    style: &ChartStyle,
    area: PlotRect,
) -> ChartResult<Option<(PlotRect, ValueScale)>> {
    let font = style.label_font_size_px;
    let x_label_height = font * LINE_HEIGHT_RATIO;
    let probe = ValueScale::covering(dataset.value_range(), 0.0, 1.0)?;
    let widest_tick = probe
        .ticks()
        .iter()
        .map(|tick| format_compact(*tick).chars().count())
        .max()
        .unwrap_or(1);
    let axis_width = widest_tick as f64 * font * GLYPH_WIDTH_RATIO + font * 0.5;

    let plot = PlotRect::new(
        area.left + axis_width,
        area.top + font * 0.5,
        area.right,
        area.bottom - x_label_height,
    );
    if !plot.is_drawable() {
        return Ok(None);
    }

    let scale = ValueScale::covering(dataset.value_range(), plot.top, plot.bottom)?;
    for tick in scale.ticks() {
        let y = scale.value_to_pixel(tick)?;
        frame.lines.push(LinePrimitive::new(
            plot.left,
            y,
            plot.right,
            y,
            GRID_STROKE_PX,
            style.grid_color,
        ));
        frame.texts.push(TextPrimitive::new(
            format_compact(tick),
            plot.left - font * 0.25,
            y - font * 0.6,
            font,
            style.text_color,
            TextHAlign::Right,
        ));
    }

    let baseline = scale.value_to_pixel(0.0)?;
    frame.lines.push(LinePrimitive::new(
        plot.left,
        plot.top,
        plot.left,
        plot.bottom,
        AXIS_STROKE_PX,
        style.axis_color,
    ));
    frame.lines.push(LinePrimitive::new(
        plot.left,
        baseline,
        plot.right,
        baseline,
        AXIS_STROKE_PX,
        style.axis_color,
    ));

    Ok(Some((plot, scale)))
}

fn draw_category_labels(
    frame: &mut RenderFrame,
    labels: &[String],
    style: &ChartStyle,
    plot: PlotRect,
) {
    if labels.is_empty() {
        return;
    }

    let font = style.label_font_size_px;
    let slot = plot.width() / labels.len() as f64;
    let widest = labels
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(1) as f64
        * font
        * GLYPH_WIDTH_RATIO;
    let stride = (widest / slot).ceil().max(1.0) as usize;

    for (index, label) in labels.iter().enumerate().step_by(stride) {
        if label.is_empty() {
            continue;
        }
        frame.texts.push(TextPrimitive::new(
            label.as_str(),
            plot.left + slot * (index as f64 + 0.5),
            plot.bottom + font * 0.25,
            font,
            style.text_color,
            TextHAlign::Center,
        ));
    }
}

fn draw_empty_marker(frame: &mut RenderFrame, style: &ChartStyle, area: PlotRect) {
    let (center_x, center_y) = area.center();
    frame.texts.push(TextPrimitive::new(
        EMPTY_LABEL,
        center_x,
        center_y - style.label_font_size_px * 0.6,
        style.label_font_size_px,
        style.axis_color,
        TextHAlign::Center,
    ));
}

fn draw_bar_chart(
    frame: &mut RenderFrame,
    dataset: &ChartDataset,
    style: &ChartStyle,
    area: PlotRect,
) -> ChartResult<()> {
    let Some((plot, scale)) = draw_value_axis(frame, dataset, style, area)? else {
        return Ok(());
    };
    if dataset.is_empty() {
        draw_empty_marker(frame, style, plot);
    }
    if dataset.labels.is_empty() || dataset.series.is_empty() {
        return Ok(());
    }

    let slot = plot.width() / dataset.labels.len() as f64;
    let bar_width = slot * BAR_FILL_RATIO / dataset.series.len() as f64;
    let group_left = slot * (1.0 - BAR_FILL_RATIO) * 0.5;
    let baseline = scale.value_to_pixel(0.0)?;
    let single_series = dataset.series.len() == 1;

    for (series_index, series) in dataset.series.iter().enumerate() {
        for (label_index, value) in series
            .values
            .iter()
            .take(dataset.labels.len())
            .enumerate()
        {
            if !value.is_finite() || *value == 0.0 {
                continue;
            }
            let y = scale.value_to_pixel(*value)?;
            let x = plot.left
                + slot * label_index as f64
                + group_left
                + bar_width * series_index as f64;
            let fill = if *value < 0.0 {
                style.negative_color
            } else if single_series {
                style.color_at(label_index)
            } else {
                style.color_at(series_index)
            };
            frame.rects.push(
                RectPrimitive::new(x, y.min(baseline), bar_width, (y - baseline).abs(), fill)
                    .with_corner_radius(2.0),
            );
        }
    }

    draw_category_labels(frame, &dataset.labels, style, plot);
    Ok(())
}

fn draw_line_chart(
    frame: &mut RenderFrame,
    dataset: &ChartDataset,
    style: &ChartStyle,
    area: PlotRect,
) -> ChartResult<()> {
    let Some((plot, scale)) = draw_value_axis(frame, dataset, style, area)? else {
        return Ok(());
    };
    if dataset.is_empty() {
        draw_empty_marker(frame, style, plot);
    }
    if dataset.labels.is_empty() {
        return Ok(());
    }

    let slot = plot.width() / dataset.labels.len() as f64;
    for (series_index, series) in dataset.series.iter().enumerate() {
        let color = style.color_at(series_index);
        let mut points = Vec::with_capacity(series.values.len());
        for (index, value) in series
            .values
            .iter()
            .take(dataset.labels.len())
            .enumerate()
        {
            if !value.is_finite() {
                continue;
            }
            points.push((
                plot.left + slot * (index as f64 + 0.5),
                scale.value_to_pixel(*value)?,
            ));
        }

        for (x, y) in &points {
            frame.rects.push(RectPrimitive::new(
                x - MARKER_SIZE_PX * 0.5,
                y - MARKER_SIZE_PX * 0.5,
                MARKER_SIZE_PX,
                MARKER_SIZE_PX,
                color,
            ));
        }
        if points.len() >= 2 {
            frame.polylines.push(PolylinePrimitive::new(
                points,
                style.series_line_width,
                color,
            ));
        }
    }

    draw_category_labels(frame, &dataset.labels, style, plot);
    Ok(())
}

fn draw_doughnut_chart(
    frame: &mut RenderFrame,
    dataset: &ChartDataset,
    style: &ChartStyle,
    area: PlotRect,
) {
    let (center_x, center_y) = area.center();
    let outer_radius = area.width().min(area.height()) * 0.45;
    let inner_radius = outer_radius * style.doughnut_hole_ratio;
    if outer_radius <= 0.0 {
        return;
    }

    let values = dataset
        .series
        .first()
        .map(|series| series.values.as_slice())
        .unwrap_or_default();
    let total: f64 = values
        .iter()
        .filter(|value| value.is_finite() && **value > 0.0)
        .sum();

    if total <= 0.0 {
        frame.wedges.push(WedgePrimitive::new(
            center_x,
            center_y,
            inner_radius,
            outer_radius,
            0.0,
            TAU,
            style.grid_color,
        ));
        draw_empty_marker(frame, style, area);
        return;
    }

    let mut angle = 0.0;
    for (index, value) in values.iter().enumerate() {
        if !value.is_finite() || *value <= 0.0 {
            continue;
        }
        let sweep = value / total * TAU;
        frame.wedges.push(WedgePrimitive::new(
            center_x,
            center_y,
            inner_radius,
            outer_radius,
            angle,
            angle + sweep,
            style.color_at(index),
        ));
        angle += sweep;
    }

    frame.texts.push(TextPrimitive::new(
        format_compact(total),
        center_x,
        center_y - style.label_font_size_px * 0.6,
        style.label_font_size_px,
        style.text_color,
        TextHAlign::Center,
    ));
}
