//! Off-screen chart capture: mount every report chart on an invisible
//! surface, wait until the paint settles, then read each surface back as a
//! PNG data URI.

mod collector;
mod config;
mod offscreen;
mod renderer;
mod scheduler;

pub use collector::{
    CaptureResultMap, ImageCollector, PNG_DATA_URI_PREFIX, decode_png_data_uri,
    encode_png_data_uri,
};
pub use config::{CaptureConfig, MAX_VIEWPORT_SIDE_PX, ReadinessPolicy};
pub use offscreen::{MountedChart, MountedStage, OffscreenStage};
pub use renderer::{ChartCaptureRenderer, capture_charts, capture_charts_with};
pub use scheduler::{CaptureCallbacks, CaptureHandle, CapturePhase, spawn_capture};
