//! plan-charts: off-screen chart rasterization for business-plan reports.
//!
//! A plan snapshot is turned into one chart per [`core::ChartKind`], each
//! painted on an invisible surface. Once the paint settles the surfaces are
//! read back as PNG data URIs and handed to the caller, typically on their way
//! to a PDF report.

pub mod capture;
pub mod core;
pub mod error;
pub mod render;
pub mod report;
pub mod telemetry;

pub use capture::{
    CaptureCallbacks, CaptureConfig, CapturePhase, CaptureResultMap, ChartCaptureRenderer,
    ReadinessPolicy, capture_charts,
};
pub use core::{ChartKind, PlanSnapshot};
pub use error::{ChartError, ChartResult};
pub use report::ReportPayload;
