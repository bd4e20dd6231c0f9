//! Normalization bounds for one rendering pass.

use crate::series::{DataPoint, Series};

/// Which signal a pass normalizes on, and over what range.
///
/// Computed once per `play` or render call and never cached across calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationStats {
    pub min: f64,
    pub range: f64,
    /// True when the primary metric was flat and `activity` is used instead.
    pub used_fallback_signal: bool,
}

impl NormalizationStats {
    /// Compute bounds over the full series.
    ///
    /// A primary range below `flat_epsilon` switches to the activity signal.
    /// Zero ranges become `1` so later division is always defined; an empty
    /// series yields `{ min: 0, range: 1 }` on the activity signal.
    pub fn compute(series: &Series, flat_epsilon: f64) -> Self {
        let mut min_primary = f64::INFINITY;
        let mut max_primary = f64::NEG_INFINITY;
        let mut min_activity = f64::INFINITY;
        let mut max_activity = f64::NEG_INFINITY;
        for p in series {
            min_primary = min_primary.min(p.primary_metric);
            max_primary = max_primary.max(p.primary_metric);
            min_activity = min_activity.min(p.activity);
            max_activity = max_activity.max(p.activity);
        }

        if series.is_empty() {
            return NormalizationStats {
                min: 0.0,
                range: 1.0,
                used_fallback_signal: true,
            };
        }

        let primary_range = max_primary - min_primary;
        if primary_range < flat_epsilon {
            let activity_range = max_activity - min_activity;
            tracing::debug!(primary_range, activity_range, "primary metric flat, normalizing on activity");
            NormalizationStats {
                min: min_activity,
                range: if activity_range == 0.0 { 1.0 } else { activity_range },
                used_fallback_signal: true,
            }
        } else {
            NormalizationStats {
                min: min_primary,
                range: primary_range,
                used_fallback_signal: false,
            }
        }
    }

    /// The raw value this pass normalizes for a given point.
    pub fn select(&self, point: &DataPoint) -> f64 {
        if self.used_fallback_signal {
            point.activity
        } else {
            point.primary_metric
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::point;

    #[test]
    fn varying_primary_is_used() {
        let series = Series::new(vec![point(1, 5.0, 0.1), point(2, 9.0, 0.3)]).unwrap();
        let stats = NormalizationStats::compute(&series, 1e-4);
        assert!(!stats.used_fallback_signal);
        assert_eq!(stats.min, 0.1);
        assert!((stats.range - 0.2).abs() < 1e-12);
    }

    #[test]
    fn flat_primary_falls_back_to_activity() {
        let series = Series::new(vec![point(1, 10.0, 1.0), point(2, 50.0, 1.0), point(3, 90.0, 1.00005)]).unwrap();
        let stats = NormalizationStats::compute(&series, 1e-4);
        assert!(stats.used_fallback_signal);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.range, 80.0);
    }

    #[test]
    fn range_exactly_at_epsilon_keeps_primary() {
        let series = Series::new(vec![point(1, 0.0, 0.0), point(2, 0.0, 0.25)]).unwrap();
        let stats = NormalizationStats::compute(&series, 0.25);
        assert!(!stats.used_fallback_signal);
    }

    #[test]
    fn single_point_has_unit_range() {
        let series = Series::new(vec![point(1, 42.0, 3.0)]).unwrap();
        let stats = NormalizationStats::compute(&series, 1e-4);
        assert!(stats.used_fallback_signal);
        assert_eq!(stats.min, 42.0);
        assert_eq!(stats.range, 1.0);
    }

    #[test]
    fn empty_series_does_not_divide_by_zero() {
        let stats = NormalizationStats::compute(&Series::default(), 1e-4);
        assert_eq!(stats.range, 1.0);
        assert!(stats.min.is_finite());
    }
}
