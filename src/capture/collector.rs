use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::MountedStage;
use crate::core::ChartKind;
use crate::error::{ChartError, ChartResult};

pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Chart images produced by one capture cycle, keyed by chart tag.
///
/// Serializes as `{"profitLoss": "data:image/png;base64,...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureResultMap {
    images: BTreeMap<ChartKind, String>,
}

impl CaptureResultMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ChartKind, data_uri: String) {
        self.images.insert(kind, data_uri);
    }

    #[must_use]
    pub fn get(&self, kind: ChartKind) -> Option<&str> {
        self.images.get(&kind).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, kind: ChartKind) -> bool {
        self.images.contains_key(&kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = ChartKind> + '_ {
        self.images.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChartKind, &str)> + '_ {
        self.images
            .iter()
            .map(|(kind, data_uri)| (*kind, data_uri.as_str()))
    }

    /// Kinds from `requested` that have no image in this map.
    #[must_use]
    pub fn missing(&self, requested: &[ChartKind]) -> Vec<ChartKind> {
        requested
            .iter()
            .copied()
            .filter(|kind| !self.contains(*kind))
            .collect()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<ChartKind, String> {
        self.images
    }
}

/// Reads mounted surfaces back into a [`CaptureResultMap`].
pub struct ImageCollector;

impl ImageCollector {
    /// Captures every readable chart of `stage`.
    ///
    /// Unreadable charts are skipped. The cycle only fails with
    /// [`ChartError::NothingCaptured`] when no chart at all could be read.
    pub fn collect(stage: &MountedStage) -> ChartResult<CaptureResultMap> {
        let mut map = CaptureResultMap::new();

        for chart in stage.charts() {
            if !chart.is_readable() {
                debug!(chart = %chart.kind(), "chart surface not readable, skipping");
                continue;
            }
            match chart.read_png() {
                Ok(png) => map.insert(chart.kind(), encode_png_data_uri(&png)),
                Err(err) => warn!(chart = %chart.kind(), error = %err, "chart capture failed"),
            }
        }

        if map.is_empty() {
            return Err(ChartError::NothingCaptured {
                attempted: stage.len(),
            });
        }
        Ok(map)
    }
}

#[must_use]
pub fn encode_png_data_uri(png: &[u8]) -> String {
    let mut data_uri = String::with_capacity(PNG_DATA_URI_PREFIX.len() + png.len() * 4 / 3 + 4);
    data_uri.push_str(PNG_DATA_URI_PREFIX);
    BASE64_STANDARD.encode_string(png, &mut data_uri);
    data_uri
}

/// Recovers PNG bytes from a data URI produced by [`encode_png_data_uri`].
pub fn decode_png_data_uri(data_uri: &str) -> ChartResult<Vec<u8>> {
    let payload = data_uri.strip_prefix(PNG_DATA_URI_PREFIX).ok_or_else(|| {
        ChartError::InvalidData("data uri is not an embedded png image".to_owned())
    })?;
    BASE64_STANDARD
        .decode(payload)
        .map_err(|err| ChartError::InvalidData(format!("invalid base64 payload: {err}")))
}

#[cfg(test)]
mod tests {
    use super::{CaptureResultMap, decode_png_data_uri, encode_png_data_uri};
    use crate::core::ChartKind;

    #[test]
    fn data_uri_carries_png_prefix_and_payload() {
        let uri = encode_png_data_uri(&[0x89, b'P', b'N', b'G']);
        assert_eq!(uri, "data:image/png;base64,iVBORw==");
        assert_eq!(
            decode_png_data_uri(&uri).expect("decode"),
            vec![0x89, b'P', b'N', b'G']
        );
    }

    #[test]
    fn foreign_data_uri_is_rejected() {
        let err = decode_png_data_uri("data:image/jpeg;base64,AAAA").expect_err("jpeg");
        assert!(format!("{err}").contains("embedded png"));
    }

    #[test]
    fn result_map_serializes_with_chart_tags() {
        let mut map = CaptureResultMap::new();
        map.insert(ChartKind::Forecast, "data:image/png;base64,AA==".to_owned());
        map.insert(ChartKind::ProfitLoss, "data:image/png;base64,AQ==".to_owned());

        let json = serde_json::to_value(&map).expect("serialize");
        assert_eq!(json["profitLoss"], "data:image/png;base64,AQ==");
        assert_eq!(json["forecast"], "data:image/png;base64,AA==");
        assert_eq!(
            map.missing(&ChartKind::ALL),
            vec![
                ChartKind::CapitalStructure,
                ChartKind::RevenueStreams,
                ChartKind::ExpenseBreakdown,
                ChartKind::Feasibility,
            ]
        );
    }
}
