use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{ChartKind, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::ChartStyle;

/// Largest accepted viewport side, in pixels.
pub const MAX_VIEWPORT_SIDE_PX: u32 = 4_096;

/// How the scheduler decides that mounted charts are safe to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPolicy {
    /// Capture as soon as every chart reports its paint finished, waiting at
    /// most `settle_delay_ms`. A delay of zero waits for the signal alone.
    #[default]
    RenderSignal,
    /// Always sleep `settle_delay_ms` after mount, then capture.
    FixedDelay,
}

/// Capture cycle configuration.
///
/// Serializable so hosts can ship it next to their report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default)]
    pub readiness: ReadinessPolicy,
    #[serde(default = "default_kinds")]
    pub kinds: Vec<ChartKind>,
    #[serde(default)]
    pub style: ChartStyle,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: default_viewport(),
            settle_delay_ms: default_settle_delay_ms(),
            readiness: ReadinessPolicy::default(),
            kinds: default_kinds(),
            style: ChartStyle::default(),
        }
    }
}

impl CaptureConfig {
    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| ChartError::Config(format!("failed to parse capture config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_readiness(mut self, readiness: ReadinessPolicy) -> Self {
        self.readiness = readiness;
        self
    }

    #[must_use]
    pub fn with_kinds(mut self, kinds: impl Into<Vec<ChartKind>>) -> Self {
        self.kinds = kinds.into();
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.viewport.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        if self.viewport.width > MAX_VIEWPORT_SIDE_PX
            || self.viewport.height > MAX_VIEWPORT_SIDE_PX
        {
            return Err(ChartError::Config(format!(
                "viewport {}x{} exceeds the {MAX_VIEWPORT_SIDE_PX}px side limit",
                self.viewport.width, self.viewport.height
            )));
        }
        if self.kinds.is_empty() {
            return Err(ChartError::Config(
                "at least one chart kind must be requested".to_owned(),
            ));
        }
        for (index, kind) in self.kinds.iter().enumerate() {
            if self.kinds[..index].contains(kind) {
                return Err(ChartError::Config(format!(
                    "chart kind `{kind}` is requested more than once"
                )));
            }
        }
        if self.readiness == ReadinessPolicy::FixedDelay && self.settle_delay_ms == 0 {
            return Err(ChartError::Config(
                "fixed-delay readiness needs a settle delay > 0".to_owned(),
            ));
        }
        self.style.validate()
    }
}

fn default_viewport() -> Viewport {
    Viewport::new(640, 360)
}

fn default_settle_delay_ms() -> u64 {
    1_000
}

fn default_kinds() -> Vec<ChartKind> {
    ChartKind::ALL.to_vec()
}
