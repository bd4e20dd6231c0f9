//! Synthesis styles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SonifyError;

/// The three fixed voice recipes.
///
/// Adding a style means adding a variant and its recipe in `dsp::voice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Style {
    /// Sawtooth lead with a sub-octave, plucky filter sweep, fast decay.
    Cyberpunk,
    /// Sine/triangle pad with a slow swell that overlaps the next note.
    Ethereal,
    /// Square-wave chiptune, gated and staccato.
    Retro,
}

impl Style {
    pub const ALL: [Style; 3] = [Style::Cyberpunk, Style::Ethereal, Style::Retro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Cyberpunk => "CYBERPUNK",
            Style::Ethereal => "ETHEREAL",
            Style::Retro => "RETRO",
        }
    }

    /// Lowercase name used in file names.
    pub fn slug(&self) -> &'static str {
        match self {
            Style::Cyberpunk => "cyberpunk",
            Style::Ethereal => "ethereal",
            Style::Retro => "retro",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cyberpunk" | "aggressive" | "sharp" => Ok(Style::Cyberpunk),
            "ethereal" | "ambient" | "pad" => Ok(Style::Ethereal),
            "retro" | "chiptune" => Ok(Style::Retro),
            _ => Err(SonifyError::UnknownStyle(s.to_string())),
        }
    }
}
