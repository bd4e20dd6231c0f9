//! Note mapping — normalized values to discrete pitches.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{DEFAULT_SCALE, JitterMode};
use crate::error::{Result, SonifyError};
use crate::series::{DataPoint, Series};
use crate::stats::NormalizationStats;

/// A fixed ascending frequency table.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    frequencies: Vec<f64>,
}

impl Scale {
    pub fn new(frequencies: Vec<f64>) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(SonifyError::InvalidConfig("scale must not be empty".into()));
        }
        if frequencies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SonifyError::InvalidConfig("scale must be strictly ascending".into()));
        }
        Ok(Scale { frequencies })
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// `floor(normalized * (N - 1))`, always within `[0, N - 1]`.
    pub fn index_for(&self, normalized: f64) -> usize {
        let top = self.frequencies.len() - 1;
        let v = if normalized.is_nan() { 0.0 } else { normalized.clamp(0.0, 1.0) };
        ((v * top as f64).floor() as usize).min(top)
    }

    pub fn frequency(&self, index: usize) -> f64 {
        self.frequencies[index.min(self.frequencies.len() - 1)]
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale {
            frequencies: DEFAULT_SCALE.to_vec(),
        }
    }
}

/// Source of the small random offset applied to floor values.
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: Option<StdRng>,
    max: f64,
}

impl Jitter {
    /// Seeded from the series content, or disabled.
    pub fn for_series(mode: JitterMode, series: &Series, max: f64) -> Self {
        let rng = match mode {
            JitterMode::Seeded => Some(StdRng::seed_from_u64(series.fingerprint())),
            JitterMode::Disabled => None,
        };
        Jitter { rng, max }
    }

    pub fn disabled() -> Self {
        Jitter { rng: None, max: 0.0 }
    }

    /// Uniform in `[0, max)`, or `0` when disabled.
    pub fn sample(&mut self) -> f64 {
        match self.rng.as_mut() {
            Some(rng) if self.max > 0.0 => rng.random_range(0.0..self.max),
            _ => 0.0,
        }
    }
}

/// Maps data points to pitches for one pass.
#[derive(Debug, Clone)]
pub struct NoteMapper<'a> {
    stats: NormalizationStats,
    scale: &'a Scale,
    jitter: Jitter,
}

/// Result of mapping one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedNote {
    pub normalized: f64,
    pub scale_index: usize,
    pub frequency: f64,
}

impl<'a> NoteMapper<'a> {
    pub fn new(stats: NormalizationStats, scale: &'a Scale, jitter: Jitter) -> Self {
        NoteMapper { stats, scale, jitter }
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    /// Normalize into `[0, 1]`.
    ///
    /// When normalizing on the fallback signal, a value sitting exactly on the
    /// floor is nudged by jitter so flat runs don't repeat one note.
    pub fn normalize(&mut self, point: &DataPoint) -> f64 {
        let value = self.stats.select(point);
        let mut normalized = (value - self.stats.min) / self.stats.range;
        if normalized == 0.0 && self.stats.used_fallback_signal {
            normalized = self.jitter.sample();
        }
        if normalized.is_nan() {
            return 0.0;
        }
        normalized.clamp(0.0, 1.0)
    }

    pub fn map(&mut self, point: &DataPoint) -> MappedNote {
        let normalized = self.normalize(point);
        let scale_index = self.scale.index_for(normalized);
        MappedNote {
            normalized,
            scale_index,
            frequency: self.scale.frequency(scale_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::point;

    #[test]
    fn index_bounds() {
        let scale = Scale::default();
        assert_eq!(scale.index_for(0.0), 0);
        assert_eq!(scale.index_for(1.0), 15);
        assert_eq!(scale.index_for(0.5), 7);
        assert_eq!(scale.index_for(1.5), 15);
        assert_eq!(scale.index_for(-0.2), 0);
        for i in 0..=1000 {
            let v = i as f64 / 1000.0;
            assert!(scale.index_for(v) <= 15);
        }
    }

    #[test]
    fn single_entry_scale() {
        let scale = Scale::new(vec![440.0]).unwrap();
        assert_eq!(scale.index_for(0.7), 0);
        assert_eq!(scale.frequency(scale.index_for(1.0)), 440.0);
    }

    #[test]
    fn rejects_descending_table() {
        assert!(Scale::new(vec![300.0, 200.0]).is_err());
        assert!(Scale::new(vec![]).is_err());
    }

    #[test]
    fn maps_primary_signal_linearly() {
        let series = Series::new(vec![point(1, 0.0, 2.0), point(2, 0.0, 4.0), point(3, 0.0, 3.0)]).unwrap();
        let stats = NormalizationStats::compute(&series, 1e-4);
        let scale = Scale::default();
        let mut mapper = NoteMapper::new(stats, &scale, Jitter::disabled());

        let notes: Vec<MappedNote> = series.iter().map(|p| mapper.map(p)).collect();
        assert_eq!(notes[0].normalized, 0.0);
        assert_eq!(notes[1].normalized, 1.0);
        assert_eq!(notes[2].normalized, 0.5);
        assert_eq!(notes[0].frequency, 130.81);
        assert_eq!(notes[1].frequency, 1046.50);
    }

    #[test]
    fn floor_jitter_only_on_fallback_signal() {
        let series = Series::new(vec![point(1, 10.0, 1.0), point(2, 90.0, 1.0)]).unwrap();
        let stats = NormalizationStats::compute(&series, 1e-4);
        let scale = Scale::default();
        let jitter = Jitter::for_series(JitterMode::Seeded, &series, 0.1);
        let mut mapper = NoteMapper::new(stats, &scale, jitter);

        let v = mapper.normalize(&series.points()[0]);
        assert!((0.0..0.1).contains(&v), "jitter out of range: {v}");

        let primary = Series::new(vec![point(1, 0.0, 1.0), point(2, 0.0, 2.0)]).unwrap();
        let stats = NormalizationStats::compute(&primary, 1e-4);
        let jitter = Jitter::for_series(JitterMode::Seeded, &primary, 0.1);
        let mut mapper = NoteMapper::new(stats, &scale, jitter);
        assert_eq!(mapper.normalize(&primary.points()[0]), 0.0);
    }

    #[test]
    fn seeded_jitter_repeats_for_same_series() {
        let series = Series::new(vec![point(1, 5.0, 1.0), point(2, 5.0, 1.0), point(3, 5.0, 1.0)]).unwrap();
        let run = || {
            let mut jitter = Jitter::for_series(JitterMode::Seeded, &series, 0.1);
            (0..3).map(|_| jitter.sample()).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
