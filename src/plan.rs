//! Note planning — the shared series → note-event pass used by both
//! live playback and offline rendering.

use serde::Serialize;

use crate::config::SonifyConfig;
use crate::error::{Result, SonifyError};
use crate::scale::{Jitter, NoteMapper, Scale};
use crate::series::Series;
use crate::stats::NormalizationStats;
use crate::style::Style;

/// The sole input to the voice synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub frequency_hz: f64,
    /// Start offset in seconds on the caller's timeline.
    pub start_time_seconds: f64,
    pub style: Style,
    pub note_duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedNote {
    pub index: usize,
    pub normalized: f64,
    pub scale_index: usize,
    pub event: NoteEvent,
}

/// Every note of one pass, in series order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePlan {
    pub tempo_seconds: f64,
    pub used_fallback_signal: bool,
    pub notes: Vec<PlannedNote>,
}

pub fn validate_tempo(tempo_seconds: f64) -> Result<()> {
    if tempo_seconds.is_finite() && tempo_seconds > 0.0 {
        Ok(())
    } else {
        Err(SonifyError::InvalidTempo(tempo_seconds))
    }
}

impl NotePlan {
    /// Compute stats once and map every point. Note `i` starts at `i * tempo`.
    pub fn build(series: &Series, style: Style, tempo_seconds: f64, config: &SonifyConfig) -> Result<Self> {
        validate_tempo(tempo_seconds)?;
        let scale = Scale::new(config.scale.clone())?;
        let stats = NormalizationStats::compute(series, config.flat_epsilon);
        let jitter = Jitter::for_series(config.jitter, series, config.jitter_max);
        let mut mapper = NoteMapper::new(stats, &scale, jitter);

        let notes = series
            .iter()
            .enumerate()
            .map(|(index, point)| {
                let mapped = mapper.map(point);
                PlannedNote {
                    index,
                    normalized: mapped.normalized,
                    scale_index: mapped.scale_index,
                    event: NoteEvent {
                        frequency_hz: mapped.frequency,
                        start_time_seconds: index as f64 * tempo_seconds,
                        style,
                        note_duration_seconds: tempo_seconds,
                    },
                }
            })
            .collect();

        Ok(NotePlan {
            tempo_seconds,
            used_fallback_signal: stats.used_fallback_signal,
            notes,
        })
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Seconds covered by the notes themselves (`len × tempo`).
    pub fn duration_seconds(&self) -> f64 {
        self.notes.len() as f64 * self.tempo_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::point;

    fn flat_series() -> Series {
        Series::new(vec![point(1, 10.0, 1.0), point(2, 50.0, 1.0), point(3, 90.0, 1.0)]).unwrap()
    }

    #[test]
    fn flat_primary_scenario() {
        let cfg = SonifyConfig {
            jitter: crate::config::JitterMode::Disabled,
            ..SonifyConfig::default()
        };
        let plan = NotePlan::build(&flat_series(), Style::Retro, 0.5, &cfg).unwrap();
        assert!(plan.used_fallback_signal);
        let normalized: Vec<f64> = plan.notes.iter().map(|n| n.normalized).collect();
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
        let starts: Vec<f64> = plan.notes.iter().map(|n| n.event.start_time_seconds).collect();
        assert_eq!(starts, vec![0.0, 0.5, 1.0]);
        assert!(plan.notes.iter().all(|n| n.event.style == Style::Retro));
        assert_eq!(plan.notes[2].scale_index, 15);
    }

    #[test]
    fn seeded_jitter_only_touches_the_floor_note() {
        let plan = NotePlan::build(&flat_series(), Style::Retro, 0.5, &SonifyConfig::default()).unwrap();
        assert!(plan.notes[0].normalized < 0.1);
        assert_eq!(plan.notes[1].normalized, 0.5);
        assert_eq!(plan.notes[2].normalized, 1.0);
        let again = NotePlan::build(&flat_series(), Style::Retro, 0.5, &SonifyConfig::default()).unwrap();
        assert_eq!(plan, again);
    }

    #[test]
    fn rejects_bad_tempo() {
        let cfg = SonifyConfig::default();
        for tempo in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                NotePlan::build(&flat_series(), Style::Ethereal, tempo, &cfg),
                Err(SonifyError::InvalidTempo(_))
            ));
        }
    }

    #[test]
    fn empty_series_plans_nothing() {
        let plan = NotePlan::build(&Series::default(), Style::Cyberpunk, 0.25, &SonifyConfig::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.duration_seconds(), 0.0);
    }
}
