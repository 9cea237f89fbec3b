//! Request body for the report/PDF generation endpoint.
//!
//! The endpoint embeds the captured chart images next to the plan's headline
//! figures. Transport is left to the host application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureResultMap;
use crate::core::{ChartKind, PlanMetrics, PlanSnapshot};
use crate::error::{ChartError, ChartResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPayload {
    pub plan_id: Option<String>,
    pub business_name: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub metrics: PlanMetrics,
    pub charts: CaptureResultMap,
    /// Requested charts that could not be captured; the report omits them.
    pub missing_charts: Vec<ChartKind>,
}

impl ReportPayload {
    pub fn new(
        plan: &PlanSnapshot,
        charts: CaptureResultMap,
        requested: &[ChartKind],
    ) -> ChartResult<Self> {
        Self::at(plan, charts, requested, Utc::now())
    }

    pub fn at(
        plan: &PlanSnapshot,
        charts: CaptureResultMap,
        requested: &[ChartKind],
        generated_at: DateTime<Utc>,
    ) -> ChartResult<Self> {
        Ok(Self {
            plan_id: plan.plan_id.clone(),
            business_name: plan.business_name.clone(),
            generated_at,
            metrics: PlanMetrics::from_plan(plan)?,
            missing_charts: charts.missing(requested),
            charts,
        })
    }

    /// Payload for a report whose capture failed entirely: figures only.
    pub fn without_charts(plan: &PlanSnapshot, requested: &[ChartKind]) -> ChartResult<Self> {
        Self::new(plan, CaptureResultMap::new(), requested)
    }

    pub fn to_json(&self) -> ChartResult<String> {
        serde_json::to_string(self)
            .map_err(|err| ChartError::InvalidData(format!("failed to encode report payload: {err}")))
    }

    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|err| ChartError::InvalidData(format!("failed to encode report payload: {err}")))
    }
}
