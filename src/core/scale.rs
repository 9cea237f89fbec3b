use smallvec::SmallVec;

use crate::error::{ChartError, ChartResult};

/// Linear mapping from a value domain onto a vertical pixel band.
///
/// `top_px` receives `domain_max` and `bottom_px` receives `domain_min`, so
/// larger values are drawn higher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    domain_min: f64,
    domain_max: f64,
    top_px: f64,
    bottom_px: f64,
}

impl ValueScale {
    pub fn new(domain_min: f64, domain_max: f64, top_px: f64, bottom_px: f64) -> ChartResult<Self> {
        if !domain_min.is_finite() || !domain_max.is_finite() || domain_min >= domain_max {
            return Err(ChartError::InvalidData(
                "scale domain must be finite and non-empty".to_owned(),
            ));
        }
        if !top_px.is_finite() || !bottom_px.is_finite() || top_px >= bottom_px {
            return Err(ChartError::InvalidData(
                "scale pixel band must be finite and top < bottom".to_owned(),
            ));
        }

        Ok(Self {
            domain_min,
            domain_max,
            top_px,
            bottom_px,
        })
    }

    /// Builds a scale that covers `range` and always includes zero, rounded
    /// outwards to a nice step. A missing or all-zero range maps to `[0, 1]`.
    pub fn covering(range: Option<(f64, f64)>, top_px: f64, bottom_px: f64) -> ChartResult<Self> {
        let (min, max) = range.unwrap_or((0.0, 0.0));
        let min = min.min(0.0);
        let max = max.max(0.0);
        if min == max {
            return Self::new(0.0, 1.0, top_px, bottom_px);
        }

        let step = nice_step(max - min);
        let domain_min = (min / step).floor() * step;
        let domain_max = (max / step).ceil() * step;
        Self::new(domain_min, domain_max, top_px, bottom_px)
    }

    #[must_use]
    pub fn domain(self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    pub fn value_to_pixel(self, value: f64) -> ChartResult<f64> {
        if !value.is_finite() {
            return Err(ChartError::InvalidData("value must be finite".to_owned()));
        }
        let normalized = (value - self.domain_min) / (self.domain_max - self.domain_min);
        Ok(self.bottom_px - normalized * (self.bottom_px - self.top_px))
    }

    pub fn pixel_to_value(self, pixel: f64) -> ChartResult<f64> {
        if !pixel.is_finite() {
            return Err(ChartError::InvalidData("pixel must be finite".to_owned()));
        }
        let normalized = (self.bottom_px - pixel) / (self.bottom_px - self.top_px);
        Ok(self.domain_min + normalized * (self.domain_max - self.domain_min))
    }

    /// Evenly spaced tick values on nice numbers, inclusive of both ends.
    #[must_use]
    pub fn ticks(self) -> SmallVec<[f64; 8]> {
        let step = nice_step(self.domain_max - self.domain_min);
        let mut ticks = SmallVec::new();
        let first = (self.domain_min / step).ceil() as i64;
        let last = (self.domain_max / step).floor() as i64;
        for index in first..=last {
            ticks.push(index as f64 * step);
        }
        ticks
    }
}

/// Step from the 1-2-5 series yielding roughly five intervals over `span`.
fn nice_step(span: f64) -> f64 {
    let raw = span / 5.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual <= 1.0 {
        1.0
    } else if residual <= 2.0 {
        2.0
    } else if residual <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}
