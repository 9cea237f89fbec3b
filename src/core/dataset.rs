use std::cmp::Reverse;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::chart_kind::{ChartKind, ChartShape};
use crate::core::metrics::{PlanMetrics, checked_sum};
use crate::core::plan::{MAX_FORECAST_MONTHS, PlanSnapshot};
use crate::core::primitives::decimal_to_f64;
use crate::error::{ChartError, ChartResult};

/// One named run of values aligned with `ChartDataset::labels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl DataSeries {
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Declarative input for one chart: what to draw, not how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataset {
    pub kind: ChartKind,
    pub shape: ChartShape,
    pub labels: Vec<String>,
    pub series: Vec<DataSeries>,
}

impl ChartDataset {
    #[must_use]
    pub fn empty(kind: ChartKind) -> Self {
        Self {
            kind,
            shape: kind.shape(),
            labels: Vec::new(),
            series: Vec::new(),
        }
    }

    /// Transforms plan figures into the dataset of `kind`.
    ///
    /// Missing figures yield zero values or an empty dataset; this only fails
    /// when a decimal cannot be represented as `f64`.
    pub fn from_plan(kind: ChartKind, plan: &PlanSnapshot) -> ChartResult<Self> {
        match kind {
            ChartKind::ProfitLoss => profit_loss(plan),
            ChartKind::CapitalStructure => capital_structure(plan),
            ChartKind::RevenueStreams => revenue_streams(plan),
            ChartKind::ExpenseBreakdown => expense_breakdown(plan),
            ChartKind::Feasibility => feasibility(plan),
            ChartKind::Forecast => forecast(plan),
        }
    }

    /// True when there is nothing but zeros to draw.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
            || self
                .series
                .iter()
                .all(|series| series.values.iter().all(|value| *value == 0.0))
    }

    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|series| series.values.iter().copied())
            .filter(|value| value.is_finite())
            .fold(None, |range, value| match range {
                None => Some((value, value)),
                Some((min, max)) => Some((min.min(value), max.max(value))),
            })
    }

    fn single_series(kind: ChartKind, name: &str, slices: Vec<(String, f64)>) -> Self {
        let (labels, values) = slices.into_iter().unzip();
        Self {
            kind,
            shape: kind.shape(),
            labels,
            series: vec![DataSeries::new(name, values)],
        }
    }
}

fn profit_loss(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let income = decimal_to_f64(plan.total_monthly_income, "total_monthly_income")?;
    let opex = decimal_to_f64(plan.total_monthly_opex, "total_monthly_opex")?;
    let net = plan
        .total_monthly_income
        .checked_sub(plan.total_monthly_opex)
        .ok_or_else(|| {
            ChartError::InvalidData(
                "monthly_net_profit overflows the supported decimal range".to_owned(),
            )
        })?;
    let net = decimal_to_f64(net, "monthly_net_profit")?;

    Ok(ChartDataset::single_series(
        ChartKind::ProfitLoss,
        "Monthly",
        vec![
            ("Income".to_owned(), income),
            ("Expenses".to_owned(), opex),
            ("Net profit".to_owned(), net),
        ],
    ))
}

fn capital_structure(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let mut slices = Vec::with_capacity(plan.capital_sources.len());
    for source in &plan.capital_sources {
        slices.push((
            source.source.clone(),
            decimal_to_f64(source.amount, "capital_sources.amount")?,
        ));
    }
    if slices.is_empty() {
        if let Some(capital) = plan.initial_capital.filter(|value| !value.is_zero()) {
            slices.push((
                "Initial capital".to_owned(),
                decimal_to_f64(capital, "initial_capital")?,
            ));
        }
    }
    Ok(ChartDataset::single_series(
        ChartKind::CapitalStructure,
        "Capital",
        sorted_slices(slices),
    ))
}

fn revenue_streams(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let mut slices = Vec::with_capacity(plan.revenue_streams.len());
    for stream in &plan.revenue_streams {
        slices.push((
            stream.name.clone(),
            decimal_to_f64(stream.monthly_amount, "revenue_streams.monthly_amount")?,
        ));
    }
    if slices.is_empty() && !plan.total_monthly_income.is_zero() {
        slices.push((
            "Monthly income".to_owned(),
            decimal_to_f64(plan.total_monthly_income, "total_monthly_income")?,
        ));
    }
    Ok(ChartDataset::single_series(
        ChartKind::RevenueStreams,
        "Revenue",
        sorted_slices(slices),
    ))
}

fn expense_breakdown(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let mut by_category: IndexMap<&str, Vec<Decimal>> = IndexMap::new();
    for expense in &plan.expenses {
        by_category
            .entry(expense.category.as_str())
            .or_default()
            .push(expense.monthly_amount);
    }

    let mut slices = Vec::with_capacity(by_category.len());
    for (category, amounts) in by_category {
        let amount = checked_sum(amounts, "expenses.monthly_amount")?;
        slices.push((
            category.to_owned(),
            decimal_to_f64(amount, "expenses.monthly_amount")?.max(0.0),
        ));
    }
    if slices.is_empty() && !plan.total_monthly_opex.is_zero() {
        slices.push((
            "Operating expenses".to_owned(),
            decimal_to_f64(plan.total_monthly_opex, "total_monthly_opex")?,
        ));
    }
    Ok(ChartDataset::single_series(
        ChartKind::ExpenseBreakdown,
        "Expenses",
        slices,
    ))
}

fn feasibility(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let metrics = PlanMetrics::from_plan(plan)?;
    let pct = |value: Option<Decimal>, field: &str| -> ChartResult<f64> {
        decimal_to_f64(value.unwrap_or(Decimal::ZERO), field)
    };

    Ok(ChartDataset::single_series(
        ChartKind::Feasibility,
        "Percent",
        vec![
            ("ROI".to_owned(), pct(metrics.roi_pct, "roi_pct")?),
            (
                "Net margin".to_owned(),
                pct(metrics.net_margin_pct, "net_margin_pct")?,
            ),
            (
                "Opex ratio".to_owned(),
                pct(metrics.opex_ratio_pct, "opex_ratio_pct")?,
            ),
        ],
    ))
}

fn forecast(plan: &PlanSnapshot) -> ChartResult<ChartDataset> {
    let mut labels = Vec::new();
    let mut revenue = Vec::new();
    let mut expenses = Vec::new();

    if plan.sales_projections.is_empty() {
        let growth = Decimal::ONE + plan.monthly_growth_pct / Decimal::ONE_HUNDRED;
        let mut month_revenue = plan.total_monthly_income;
        for month in 1..=plan.forecast_months.min(MAX_FORECAST_MONTHS) {
            labels.push(format!("M{month}"));
            revenue.push(decimal_to_f64(month_revenue, "forecast.revenue")?);
            expenses.push(decimal_to_f64(plan.total_monthly_opex, "forecast.expenses")?);
            month_revenue = month_revenue.checked_mul(growth).unwrap_or(month_revenue);
        }
    } else {
        for projection in &plan.sales_projections {
            labels.push(projection.period.clone());
            revenue.push(decimal_to_f64(projection.revenue, "sales_projections.revenue")?);
            expenses.push(decimal_to_f64(
                projection.expenses,
                "sales_projections.expenses",
            )?);
        }
    }

    let net = revenue
        .iter()
        .zip(&expenses)
        .map(|(revenue, expenses)| revenue - expenses)
        .collect();

    Ok(ChartDataset {
        kind: ChartKind::Forecast,
        shape: ChartShape::Line,
        labels,
        series: vec![
            DataSeries::new("Revenue", revenue),
            DataSeries::new("Expenses", expenses),
            DataSeries::new("Net profit", net),
        ],
    })
}

/// Largest slice first; negative amounts cannot be drawn as wedges.
fn sorted_slices(mut slices: Vec<(String, f64)>) -> Vec<(String, f64)> {
    for (_, value) in &mut slices {
        *value = value.max(0.0);
    }
    slices.sort_by_key(|(_, value)| Reverse(OrderedFloat(*value)));
    slices
}
