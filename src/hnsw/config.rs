use serde::{Deserialize, Serialize};

use crate::metric::MetricKind;

/// HNSW algorithm parameters.
///
/// # Size
/// 32 bytes, aligned to 4
///
/// # Parameter Guidelines (from paper)
/// - M: 12-48 for high recall, 4-8 for speed
/// - `ef_construction`: Higher = better quality, slower build
/// - `ef_search`: Higher = better recall, slower search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(C)]
pub struct HnswConfig {
    /// Max connections per node in layers > 0
    /// Typical: 16
    pub m: u32, // offset 0, size 4

    /// Max connections per node in layer 0 (typically 2*M)
    /// Typical: 32
    pub m0: u32, // offset 4, size 4

    /// Construction-time candidate list size
    /// Typical: 200
    pub ef_construction: u32, // offset 8, size 4

    /// Search-time candidate list size
    /// Typical: 50
    pub ef_search: u32, // offset 12, size 4

    /// Vector dimensionality
    pub dimensions: u32, // offset 16, size 4

    /// Raw encoding of the configured [`MetricKind`]
    pub metric: u32, // offset 20, size 4

    /// Reserved for future use
    pub _reserved: [u32; 2], // offset 24, size 8
}

impl HnswConfig {
    /// Creates a default configuration using L2 Squared distance.
    #[must_use]
    pub fn new(dimensions: u32) -> Self {
        Self {
            m: 12,
            m0: 24,
            ef_construction: 100,
            ef_search: 50,
            dimensions,
            metric: MetricKind::L2Squared.as_raw(),
            _reserved: [0; 2],
        }
    }

    /// Sets the metric, replacing the default L2.
    #[must_use]
    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric.as_raw();
        self
    }

    /// Decodes the stored metric kind.
    ///
    /// # Panics
    ///
    /// Panics if the stored value isn't a known [`MetricKind`]; this can
    /// only happen if the config was constructed outside this API.
    #[must_use]
    pub fn metric_kind(&self) -> MetricKind {
        MetricKind::from_raw(self.metric).expect("HnswConfig.metric holds an unknown MetricKind")
    }
}

// Verify size and alignment
const _: () = assert!(core::mem::size_of::<HnswConfig>() == 32);
const _: () = assert!(core::mem::align_of::<HnswConfig>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = HnswConfig::new(128);
        assert!(cfg.m0 >= cfg.m);
        assert_eq!(cfg.metric_kind(), MetricKind::L2Squared);
    }

    #[test]
    fn with_metric_overrides_default() {
        let cfg = HnswConfig::new(128).with_metric(MetricKind::Cosine);
        assert_eq!(cfg.metric_kind(), MetricKind::Cosine);
    }
}
