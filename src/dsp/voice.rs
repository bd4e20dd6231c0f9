//! Voice — one note built from a style recipe: two oscillators into a
//! low-pass filter, shaped by a gain envelope.

use crate::plan::NoteEvent;
use crate::style::Style;

use super::envelope::Automation;
use super::filter::LowpassFilter;
use super::oscillator::{Oscillator, Waveform};

/// Level of the secondary oscillator in the cyberpunk and ethereal recipes.
const SECONDARY_LEVEL: f64 = 0.4;

/// A single rendered note.
///
/// The voice has no notion of wall-clock time: sample `n` is always
/// `n / sample_rate` seconds after the note's own start.
#[derive(Debug, Clone)]
pub struct Voice {
    primary: Oscillator,
    /// Secondary oscillator and the level it is mixed in at.
    secondary: Option<(Oscillator, f64)>,
    filter: LowpassFilter,
    cutoff: Automation,
    gain: Automation,
    sample_rate: f64,
    position: usize,
    /// Oscillator lifetime in samples, including the safety tail.
    length: usize,
}

impl Voice {
    /// Build the voice for `event`. Oscillators run for the note duration
    /// plus `oscillator_tail` seconds so the envelope finishes before they stop.
    pub fn new(event: &NoteEvent, sample_rate: f64, oscillator_tail: f64) -> Self {
        let f = event.frequency_hz;
        let d = event.note_duration_seconds;
        let length = ((d + oscillator_tail) * sample_rate).round() as usize;

        let (primary, secondary, filter, cutoff, gain) = match event.style {
            Style::Cyberpunk => {
                let attack = 0.02;
                let gain = Automation::new(0.0)
                    .set_value_at(0.0, 0.0)
                    .linear_ramp_to(attack, 0.2)
                    .exponential_ramp_to(d.max(attack), 0.001);
                let cutoff = Automation::new(f * 1.5)
                    .set_value_at(0.0, f * 1.5)
                    .exponential_ramp_to(0.1, f * 4.0);
                (
                    Oscillator::new(Waveform::Sawtooth, f, sample_rate),
                    Some((Oscillator::new(Waveform::Square, f / 2.0, sample_rate), SECONDARY_LEVEL)),
                    LowpassFilter::new(f * 1.5, 5.0, sample_rate),
                    cutoff,
                    gain,
                )
            }
            Style::Ethereal => {
                // Rings past the step so consecutive notes overlap.
                let duration = d * 1.5;
                let gain = Automation::new(0.0)
                    .set_value_at(0.0, 0.0)
                    .linear_ramp_to(duration * 0.4, 0.3)
                    .exponential_ramp_to(duration, 0.001);
                (
                    Oscillator::new(Waveform::Sine, f, sample_rate),
                    Some((Oscillator::new(Waveform::Triangle, f, sample_rate), SECONDARY_LEVEL)),
                    LowpassFilter::new(1000.0, 0.0, sample_rate),
                    Automation::constant(1000.0),
                    gain,
                )
            }
            Style::Retro => {
                let onset = 0.005;
                let duration = d * 0.8;
                let hold_end = (duration * 0.8).max(onset);
                let gain = Automation::new(0.0)
                    .set_value_at(0.0, 0.0)
                    .set_value_at(onset, 0.15)
                    .set_value_at(hold_end, 0.15)
                    .set_value_at(duration.max(hold_end), 0.0);
                (
                    Oscillator::new(Waveform::Square, f, sample_rate),
                    Some((Oscillator::new(Waveform::Square, f * 2.0, sample_rate), 1.0)),
                    LowpassFilter::new(3000.0, 1.0, sample_rate),
                    Automation::constant(3000.0),
                    gain,
                )
            }
        };

        Voice {
            primary,
            secondary,
            filter,
            cutoff,
            gain,
            sample_rate,
            position: 0,
            length,
        }
    }

    /// Total samples this voice produces.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Generate the next sample; zero once the oscillators have stopped.
    pub fn next_sample(&mut self) -> f64 {
        if self.position >= self.length {
            return 0.0;
        }

        let t = self.position as f64 / self.sample_rate;
        self.filter.set_frequency(self.cutoff.value_at(t));

        let mut input = self.primary.next_sample();
        if let Some((osc, level)) = self.secondary.as_mut() {
            input += osc.next_sample() * *level;
        }

        self.position += 1;
        self.filter.process(input) * self.gain.value_at(t)
    }

    /// Has the voice rendered all of its samples?
    pub fn is_finished(&self) -> bool {
        self.position >= self.length
    }
}
