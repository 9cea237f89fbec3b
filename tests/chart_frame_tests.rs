use std::f64::consts::TAU;

use approx::assert_relative_eq;
use plan_charts::core::{
    CapitalSource, ChartDataset, ChartKind, DataSeries, PlanSnapshot, Viewport,
};
use plan_charts::render::{ChartStyle, build_chart_frame};
use rust_decimal::Decimal;

fn has_text(frame: &plan_charts::render::RenderFrame, needle: &str) -> bool {
    frame.texts.iter().any(|text| text.text == needle)
}

#[test]
fn bar_chart_draws_one_rect_per_nonzero_value() {
    let plan = PlanSnapshot::default()
        .with_monthly_totals(Decimal::from(10_000_000), Decimal::from(5_000_000));
    let dataset = ChartDataset::from_plan(ChartKind::ProfitLoss, &plan).expect("dataset");
    let frame = build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(640, 360))
        .expect("frame");

    frame.validate().expect("valid frame");
    assert_eq!(frame.rects.len(), 3);
    assert!(has_text(&frame, "Monthly Profit & Loss"));
    assert!(has_text(&frame, "Income"));
    assert!(has_text(&frame, "10M"));
    assert!(!has_text(&frame, "No data"));
}

#[test]
fn negative_bars_use_negative_color_and_hang_below_baseline() {
    let style = ChartStyle::default();
    let dataset = ChartDataset {
        kind: ChartKind::ProfitLoss,
        shape: ChartKind::ProfitLoss.shape(),
        labels: vec!["Income".to_owned(), "Net profit".to_owned()],
        series: vec![DataSeries::new("Monthly", vec![100.0, -50.0])],
    };
    let frame = build_chart_frame(&dataset, &style, Viewport::new(640, 360)).expect("frame");

    assert_eq!(frame.rects.len(), 2);
    let positive = frame.rects[0];
    let negative = frame.rects[1];
    assert_eq!(negative.fill_color, style.negative_color);
    assert!(negative.y >= positive.y + positive.height - 1e-9);
}

#[test]
fn doughnut_wedges_cover_full_circle() {
    let plan = PlanSnapshot::default()
        .with_capital_source(CapitalSource::new("Savings", Decimal::from(3_000)))
        .with_capital_source(CapitalSource::new("Loan", Decimal::from(1_000)));
    let dataset = ChartDataset::from_plan(ChartKind::CapitalStructure, &plan).expect("dataset");
    let frame = build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(640, 360))
        .expect("frame");

    assert_eq!(frame.wedges.len(), 2);
    let sweep: f64 = frame
        .wedges
        .iter()
        .map(|wedge| wedge.end_angle - wedge.start_angle)
        .sum();
    assert_relative_eq!(sweep, TAU, epsilon = 1e-9);
    assert_relative_eq!(frame.wedges[0].end_angle, TAU * 0.75, epsilon = 1e-9);
    assert!(has_text(&frame, "Savings (75%)"));
    assert!(has_text(&frame, "4k"));
}

#[test]
fn line_chart_emits_one_polyline_per_series() {
    let plan = PlanSnapshot::default()
        .with_monthly_totals(Decimal::from(1_000), Decimal::from(400))
        .with_forecast(6, Decimal::from(5));
    let dataset = ChartDataset::from_plan(ChartKind::Forecast, &plan).expect("dataset");
    let frame = build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(640, 360))
        .expect("frame");

    assert_eq!(frame.polylines.len(), 3);
    assert!(frame.polylines.iter().all(|line| line.points.len() == 6));
    assert!(has_text(&frame, "Revenue"));
    assert!(has_text(&frame, "Net profit"));
}

#[test]
fn empty_datasets_still_produce_drawable_frames() {
    let plan = PlanSnapshot::default();
    for kind in ChartKind::ALL {
        let dataset = ChartDataset::from_plan(kind, &plan).expect("dataset");
        let frame = build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(320, 200))
            .expect("frame");

        frame.validate().expect("valid frame");
        assert!(!frame.is_empty(), "{kind} frame is empty");
        assert!(has_text(&frame, "No data"), "{kind} frame lacks the empty marker");
    }
}

#[test]
fn tiny_viewport_keeps_title_only() {
    let dataset = ChartDataset::empty(ChartKind::Feasibility);
    let frame = build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(20, 20))
        .expect("frame");

    frame.validate().expect("valid frame");
    assert!(frame.rects.is_empty());
    assert!(has_text(&frame, "Feasibility Indicators (%)"));
}

#[test]
fn invalid_viewport_is_rejected() {
    let dataset = ChartDataset::empty(ChartKind::ProfitLoss);
    assert!(build_chart_frame(&dataset, &ChartStyle::default(), Viewport::new(0, 360)).is_err());
}
