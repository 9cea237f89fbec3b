use plan_charts::core::{
    CapitalSource, ChartDataset, ChartKind, ExpenseItem, PlanSnapshot, RevenueStream, Viewport,
};
use plan_charts::render::{ChartStyle, build_chart_frame};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn money() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn every_chart_of_a_valid_plan_builds_a_valid_frame(
        income in money(),
        opex in money(),
        capital in prop::collection::vec(money(), 0..5),
        streams in prop::collection::vec(money(), 0..5),
        expenses in prop::collection::vec(money(), 0..6),
        months in 0u32..36,
        growth in -20i64..40,
        width in 40u32..1600,
        height in 40u32..900
    ) {
        let mut plan = PlanSnapshot::default()
            .with_monthly_totals(income, opex)
            .with_forecast(months, Decimal::from(growth));
        for (index, amount) in capital.into_iter().enumerate() {
            plan = plan.with_capital_source(CapitalSource::new(format!("Source {index}"), amount));
        }
        for (index, amount) in streams.into_iter().enumerate() {
            plan = plan.with_revenue_stream(RevenueStream::new(format!("Stream {index}"), amount));
        }
        for (index, amount) in expenses.into_iter().enumerate() {
            plan = plan.with_expense(ExpenseItem::new(format!("Category {}", index % 3), amount));
        }
        prop_assert!(plan.validate().is_ok());

        let viewport = Viewport::new(width, height);
        for kind in ChartKind::ALL {
            let dataset = ChartDataset::from_plan(kind, &plan).expect("dataset");
            let frame = build_chart_frame(&dataset, &ChartStyle::default(), viewport)
                .expect("frame");
            prop_assert!(frame.validate().is_ok());
            prop_assert!(!frame.texts.is_empty());
            for wedge in &frame.wedges {
                prop_assert!(wedge.end_angle <= std::f64::consts::TAU + 1e-9);
            }
        }
    }

    #[test]
    fn doughnut_slices_never_go_negative(
        amounts in prop::collection::vec(-1_000_000i64..1_000_000, 1..8)
    ) {
        let mut plan = PlanSnapshot::default();
        for (index, amount) in amounts.into_iter().enumerate() {
            plan = plan.with_capital_source(CapitalSource::new(format!("S{index}"), Decimal::from(amount)));
        }
        let dataset = ChartDataset::from_plan(ChartKind::CapitalStructure, &plan).expect("dataset");
        let values = &dataset.series[0].values;
        prop_assert!(values.iter().all(|value| *value >= 0.0));
        prop_assert!(values.windows(2).all(|pair| pair[0] >= pair[1]));
    }
}
