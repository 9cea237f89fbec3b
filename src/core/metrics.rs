use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::plan::PlanSnapshot;
use crate::core::primitives::percent_of;
use crate::error::{ChartError, ChartResult};

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const FEASIBLE_PAYBACK_MONTHS: Decimal = Decimal::from_parts(36, 0, 0, false, 0);

/// Client-side figures derived from a [`PlanSnapshot`].
///
/// These mirror what the plan service reports so charts and report headers can
/// be drawn without a round trip. Ratios that would divide by zero are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetrics {
    pub total_capital: Decimal,
    pub total_revenue_streams: Decimal,
    pub total_itemized_expenses: Decimal,
    pub monthly_net_profit: Decimal,
    pub annual_net_profit: Decimal,
    pub net_margin_pct: Option<Decimal>,
    pub opex_ratio_pct: Option<Decimal>,
    pub roi_pct: Option<Decimal>,
    pub payback_months: Option<Decimal>,
    pub is_feasible: bool,
}

impl PlanMetrics {
    /// Fails with [`ChartError::InvalidData`] when a figure overflows `Decimal`.
    pub fn from_plan(plan: &PlanSnapshot) -> ChartResult<Self> {
        let total_capital = total_capital(plan)?;
        let total_revenue_streams = checked_sum(
            plan.revenue_streams.iter().map(|stream| stream.monthly_amount),
            "revenue_streams.monthly_amount",
        )?;
        let total_itemized_expenses = checked_sum(
            plan.expenses.iter().map(|expense| expense.monthly_amount),
            "expenses.monthly_amount",
        )?;

        let monthly_net_profit = plan
            .total_monthly_income
            .checked_sub(plan.total_monthly_opex)
            .ok_or_else(|| overflow("monthly_net_profit"))?;
        let annual_net_profit = monthly_net_profit
            .checked_mul(MONTHS_PER_YEAR)
            .ok_or_else(|| overflow("annual_net_profit"))?;

        let payback_months = if monthly_net_profit > Decimal::ZERO && !total_capital.is_zero() {
            let months = total_capital
                .checked_div(monthly_net_profit)
                .ok_or_else(|| overflow("payback_months"))?;
            Some(months.round_dp(2))
        } else {
            None
        };

        let is_feasible = monthly_net_profit > Decimal::ZERO
            && payback_months.is_none_or(|months| months <= FEASIBLE_PAYBACK_MONTHS);

        Ok(Self {
            total_capital,
            total_revenue_streams,
            total_itemized_expenses,
            monthly_net_profit,
            annual_net_profit,
            net_margin_pct: round_pct(percent_of(monthly_net_profit, plan.total_monthly_income)),
            opex_ratio_pct: round_pct(percent_of(
                plan.total_monthly_opex,
                plan.total_monthly_income,
            )),
            roi_pct: round_pct(percent_of(annual_net_profit, total_capital)),
            payback_months,
            is_feasible,
        })
    }
}

/// Declared initial capital, or the sum of the listed capital sources.
pub fn total_capital(plan: &PlanSnapshot) -> ChartResult<Decimal> {
    match plan.initial_capital {
        Some(capital) => Ok(capital),
        None => checked_sum(
            plan.capital_sources.iter().map(|source| source.amount),
            "capital_sources.amount",
        ),
    }
}

pub(crate) fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    field_name: &str,
) -> ChartResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))
        .ok_or_else(|| overflow(field_name))
}

fn overflow(field_name: &str) -> ChartError {
    ChartError::InvalidData(format!("{field_name} overflows the supported decimal range"))
}

fn round_pct(value: Option<Decimal>) -> Option<Decimal> {
    value.map(|pct| pct.round_dp(2))
}
