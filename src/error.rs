use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid viewport size: width={width}, height={height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid capture config: {0}")]
    Config(String),

    #[error("render backend failure: {0}")]
    Backend(String),

    #[error("no chart surface could be captured ({attempted} attempted)")]
    NothingCaptured { attempted: usize },

    #[error("capture cycle was cancelled before it completed")]
    Cancelled,

    #[error("capture cycle aborted: {0}")]
    Aborted(String),
}
