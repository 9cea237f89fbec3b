use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::metrics::PlanMetrics;
use crate::error::{ChartError, ChartResult};

/// Longest projected forecast, ten years of monthly points.
pub const MAX_FORECAST_MONTHS: u32 = 120;

/// One funding line of the plan's initial capital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalSource {
    pub source: String,
    #[serde(default)]
    pub amount: Decimal,
}

impl CapitalSource {
    #[must_use]
    pub fn new(source: impl Into<String>, amount: Decimal) -> Self {
        Self {
            source: source.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueStream {
    pub name: String,
    #[serde(default)]
    pub monthly_amount: Decimal,
}

impl RevenueStream {
    #[must_use]
    pub fn new(name: impl Into<String>, monthly_amount: Decimal) -> Self {
        Self {
            name: name.into(),
            monthly_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseItem {
    pub category: String,
    #[serde(default)]
    pub monthly_amount: Decimal,
}

impl ExpenseItem {
    #[must_use]
    pub fn new(category: impl Into<String>, monthly_amount: Decimal) -> Self {
        Self {
            category: category.into(),
            monthly_amount,
        }
    }
}

/// Projected figures for one forecast period (usually a month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesProjection {
    pub period: String,
    #[serde(default)]
    pub revenue: Decimal,
    #[serde(default)]
    pub expenses: Decimal,
}

impl SalesProjection {
    #[must_use]
    pub fn new(period: impl Into<String>, revenue: Decimal, expenses: Decimal) -> Self {
        Self {
            period: period.into(),
            revenue,
            expenses,
        }
    }
}

/// Read-only financial aggregate captured into one report.
///
/// Every field is optional on the wire: missing figures default to zero and
/// missing lists to empty, so a partially filled plan still renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub total_monthly_income: Decimal,
    #[serde(default)]
    pub total_monthly_opex: Decimal,
    #[serde(default)]
    pub initial_capital: Option<Decimal>,
    #[serde(default)]
    pub capital_sources: Vec<CapitalSource>,
    #[serde(default)]
    pub revenue_streams: Vec<RevenueStream>,
    #[serde(default)]
    pub expenses: Vec<ExpenseItem>,
    #[serde(default)]
    pub sales_projections: Vec<SalesProjection>,
    #[serde(default = "default_forecast_months")]
    pub forecast_months: u32,
    #[serde(default)]
    pub monthly_growth_pct: Decimal,
}

impl Default for PlanSnapshot {
    fn default() -> Self {
        Self {
            plan_id: None,
            business_name: None,
            total_monthly_income: Decimal::ZERO,
            total_monthly_opex: Decimal::ZERO,
            initial_capital: None,
            capital_sources: Vec::new(),
            revenue_streams: Vec::new(),
            expenses: Vec::new(),
            sales_projections: Vec::new(),
            forecast_months: default_forecast_months(),
            monthly_growth_pct: Decimal::ZERO,
        }
    }
}

impl PlanSnapshot {
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|err| ChartError::InvalidData(format!("failed to parse plan snapshot: {err}")))
    }

    #[must_use]
    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    #[must_use]
    pub fn with_business_name(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_monthly_totals(mut self, income: Decimal, opex: Decimal) -> Self {
        self.total_monthly_income = income;
        self.total_monthly_opex = opex;
        self
    }

    #[must_use]
    pub fn with_initial_capital(mut self, capital: Decimal) -> Self {
        self.initial_capital = Some(capital);
        self
    }

    #[must_use]
    pub fn with_capital_source(mut self, source: CapitalSource) -> Self {
        self.capital_sources.push(source);
        self
    }

    #[must_use]
    pub fn with_revenue_stream(mut self, stream: RevenueStream) -> Self {
        self.revenue_streams.push(stream);
        self
    }

    #[must_use]
    pub fn with_expense(mut self, expense: ExpenseItem) -> Self {
        self.expenses.push(expense);
        self
    }

    #[must_use]
    pub fn with_sales_projection(mut self, projection: SalesProjection) -> Self {
        self.sales_projections.push(projection);
        self
    }

    #[must_use]
    pub fn with_forecast(mut self, months: u32, monthly_growth_pct: Decimal) -> Self {
        self.forecast_months = months;
        self.monthly_growth_pct = monthly_growth_pct;
        self
    }

    /// Rejects negative money figures, forecasts longer than
    /// [`MAX_FORECAST_MONTHS`] and figures whose derived totals overflow.
    /// Zero and empty are always accepted.
    pub fn validate(&self) -> ChartResult<()> {
        if self.forecast_months > MAX_FORECAST_MONTHS {
            return Err(ChartError::InvalidData(format!(
                "forecast_months must be <= {MAX_FORECAST_MONTHS}, got {}",
                self.forecast_months
            )));
        }
        ensure_non_negative(self.total_monthly_income, "total_monthly_income")?;
        ensure_non_negative(self.total_monthly_opex, "total_monthly_opex")?;
        if let Some(capital) = self.initial_capital {
            ensure_non_negative(capital, "initial_capital")?;
        }
        for source in &self.capital_sources {
            ensure_non_negative(source.amount, "capital_sources.amount")?;
        }
        for stream in &self.revenue_streams {
            ensure_non_negative(stream.monthly_amount, "revenue_streams.monthly_amount")?;
        }
        for expense in &self.expenses {
            ensure_non_negative(expense.monthly_amount, "expenses.monthly_amount")?;
        }
        for projection in &self.sales_projections {
            ensure_non_negative(projection.revenue, "sales_projections.revenue")?;
            ensure_non_negative(projection.expenses, "sales_projections.expenses")?;
        }
        PlanMetrics::from_plan(self)?;
        Ok(())
    }
}

fn default_forecast_months() -> u32 {
    12
}

fn ensure_non_negative(value: Decimal, field_name: &str) -> ChartResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ChartError::InvalidData(format!(
            "{field_name} must be >= 0, got {value}"
        )));
    }
    Ok(())
}
