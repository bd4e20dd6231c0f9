//! Input series — the ordered measurements that drive a melody.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SonifyError};

/// One measurement from the upstream collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub sequence_number: u64,
    /// Secondary signal, used when the primary metric is flat.
    pub activity: f64,
    /// Principal signal (e.g. a fee or price).
    pub primary_metric: f64,
    /// Unix seconds.
    pub timestamp: i64,
}

/// An ordered run of data points with strictly increasing sequence numbers.
///
/// An empty series is allowed and treated as a degenerate (silent) input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series {
    points: Vec<DataPoint>,
}

impl Series {
    pub fn new(points: Vec<DataPoint>) -> Result<Self> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].sequence_number <= pair[0].sequence_number {
                return Err(SonifyError::NonMonotonicSequence {
                    index: index + 1,
                    previous: pair[0].sequence_number,
                    current: pair[1].sequence_number,
                });
            }
        }
        Ok(Series { points })
    }

    /// Parse a JSON array of data points.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let points: Vec<DataPoint> = serde_json::from_str(json)?;
        Series::new(points)
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DataPoint> {
        self.points.iter()
    }

    /// Stable 64-bit fingerprint of the series content.
    ///
    /// Used to seed per-render randomness so identical series always
    /// produce identical notes.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Sha256::new();
        for p in &self.points {
            hasher.update(p.sequence_number.to_le_bytes());
            hasher.update(p.activity.to_bits().to_le_bytes());
            hasher.update(p.primary_metric.to_bits().to_le_bytes());
            hasher.update(p.timestamp.to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(seed)
    }

    /// Aggregate figures handed to the description collaborator.
    pub fn summary(&self) -> SeriesSummary {
        SeriesSummary::from_series(self)
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<DataPoint>::deserialize(deserializer)?;
        Series::new(points).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a DataPoint;
    type IntoIter = std::slice::Iter<'a, DataPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Summary statistics of the primary metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    pub count: usize,
    pub avg_primary: f64,
    pub max_primary: f64,
    pub min_primary: f64,
    /// Seconds between the first and last timestamp.
    pub span_seconds: i64,
}

impl SeriesSummary {
    fn from_series(series: &Series) -> Self {
        let points = series.points();
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return SeriesSummary {
                count: 0,
                avg_primary: 0.0,
                max_primary: 0.0,
                min_primary: 0.0,
                span_seconds: 0,
            };
        };

        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        let mut min = f64::INFINITY;
        for p in points {
            sum += p.primary_metric;
            max = max.max(p.primary_metric);
            min = min.min(p.primary_metric);
        }

        SeriesSummary {
            count: points.len(),
            avg_primary: sum / points.len() as f64,
            max_primary: max,
            min_primary: min,
            span_seconds: last.timestamp - first.timestamp,
        }
    }
}

#[cfg(test)]
pub(crate) fn point(seq: u64, activity: f64, primary: f64) -> DataPoint {
    DataPoint {
        sequence_number: seq,
        activity,
        primary_metric: primary,
        timestamp: 1_700_000_000 + seq as i64 * 3600,
    }
}
