pub mod chart_kind;
pub mod dataset;
pub mod metrics;
pub mod plan;
pub mod primitives;
pub mod scale;
pub mod types;

pub use chart_kind::{ChartKind, ChartShape};
pub use dataset::{ChartDataset, DataSeries};
pub use metrics::{PlanMetrics, total_capital};
pub use plan::{
    CapitalSource, ExpenseItem, MAX_FORECAST_MONTHS, PlanSnapshot, RevenueStream, SalesProjection,
};
pub use scale::ValueScale;
pub use types::{PlotRect, Viewport};
