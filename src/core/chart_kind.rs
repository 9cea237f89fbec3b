use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

/// How a chart kind is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartShape {
    Bar,
    Doughnut,
    Line,
}

/// Closed set of report charts.
///
/// The tag (`as_tag`) is the key used in capture result maps and report
/// payloads, so renaming a variant's tag is a wire-format change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    ProfitLoss,
    CapitalStructure,
    RevenueStreams,
    ExpenseBreakdown,
    Feasibility,
    Forecast,
}

impl ChartKind {
    /// Report order.
    pub const ALL: [ChartKind; 6] = [
        ChartKind::ProfitLoss,
        ChartKind::CapitalStructure,
        ChartKind::RevenueStreams,
        ChartKind::ExpenseBreakdown,
        ChartKind::Feasibility,
        ChartKind::Forecast,
    ];

    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::ProfitLoss => "profitLoss",
            Self::CapitalStructure => "capitalStructure",
            Self::RevenueStreams => "revenueStreams",
            Self::ExpenseBreakdown => "expenseBreakdown",
            Self::Feasibility => "feasibility",
            Self::Forecast => "forecast",
        }
    }

    #[must_use]
    pub const fn shape(self) -> ChartShape {
        match self {
            Self::ProfitLoss | Self::Feasibility => ChartShape::Bar,
            Self::CapitalStructure | Self::RevenueStreams | Self::ExpenseBreakdown => {
                ChartShape::Doughnut
            }
            Self::Forecast => ChartShape::Line,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ProfitLoss => "Monthly Profit & Loss",
            Self::CapitalStructure => "Capital Structure",
            Self::RevenueStreams => "Revenue Streams",
            Self::ExpenseBreakdown => "Expense Breakdown",
            Self::Feasibility => "Feasibility Indicators (%)",
            Self::Forecast => "Financial Forecast",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_tag() == tag)
            .ok_or_else(|| ChartError::InvalidData(format!("unknown chart tag `{tag}`")))
    }
}
