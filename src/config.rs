//! Engine configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SonifyError};

/// Reference sample rate for export.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Pentatonic scale (C minor pentatonic, C3..C6).
pub const DEFAULT_SCALE: [f64; 16] = [
    130.81,  // C3
    155.56,  // Eb3
    174.61,  // F3
    196.00,  // G3
    233.08,  // Bb3
    261.63,  // C4
    311.13,  // Eb4
    349.23,  // F4
    392.00,  // G4
    466.16,  // Bb4
    523.25,  // C5
    622.25,  // Eb5
    698.46,  // F5
    783.99,  // G5
    932.33,  // Bb5
    1046.50, // C6
];

/// How the anti-monotony jitter is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JitterMode {
    /// Seeded from the series content; identical inputs give identical notes.
    #[default]
    Seeded,
    /// No jitter at all.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SonifyConfig {
    pub sample_rate: u32,
    /// Gain of the shared master bus.
    pub master_gain: f64,
    /// Silence appended after the last note of an export.
    pub render_tail_seconds: f64,
    /// How long oscillators keep running past the nominal note duration.
    pub oscillator_tail_seconds: f64,
    /// Primary ranges below this switch normalization to the activity signal.
    pub flat_epsilon: f64,
    pub jitter: JitterMode,
    /// Upper bound (exclusive) of the jitter added to floor values.
    pub jitter_max: f64,
    /// Ascending frequency table in Hz.
    pub scale: Vec<f64>,
}

impl Default for SonifyConfig {
    fn default() -> Self {
        SonifyConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            master_gain: 0.3,
            render_tail_seconds: 2.0,
            oscillator_tail_seconds: 0.5,
            flat_epsilon: 1e-4,
            jitter: JitterMode::Seeded,
            jitter_max: 0.1,
            scale: DEFAULT_SCALE.to_vec(),
        }
    }
}

impl SonifyConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SonifyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(invalid("sampleRate must be positive"));
        }
        if !(self.master_gain > 0.0 && self.master_gain <= 1.0) {
            return Err(invalid("masterGain must be in (0, 1]"));
        }
        if !(self.render_tail_seconds >= 0.0 && self.render_tail_seconds.is_finite()) {
            return Err(invalid("renderTailSeconds must be non-negative"));
        }
        if !(self.oscillator_tail_seconds >= 0.0 && self.oscillator_tail_seconds.is_finite()) {
            return Err(invalid("oscillatorTailSeconds must be non-negative"));
        }
        if !(self.flat_epsilon >= 0.0) {
            return Err(invalid("flatEpsilon must be non-negative"));
        }
        if !(self.jitter_max >= 0.0 && self.jitter_max <= 1.0) {
            return Err(invalid("jitterMax must be in [0, 1]"));
        }
        if self.scale.is_empty() {
            return Err(invalid("scale must not be empty"));
        }
        if self.scale.iter().any(|&f| !(f > 0.0 && f.is_finite())) {
            return Err(invalid("scale frequencies must be positive"));
        }
        if self.scale.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("scale must be strictly ascending"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> SonifyError {
    SonifyError::InvalidConfig(msg.to_string())
}
