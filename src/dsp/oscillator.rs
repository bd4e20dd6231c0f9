//! Band-limited oscillators (PolyBLEP).

use std::f64::consts::PI;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// A fixed-frequency oscillator. Phase starts at zero so every note
/// renders the same samples no matter when it is triggered.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f64,
    phase_inc: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
            phase_inc: frequency / sample_rate,
        }
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let inc = self.phase_inc;
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Sawtooth => self.sawtooth(inc),
            Waveform::Square => self.square(inc),
            Waveform::Triangle => self.triangle(),
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }

    /// Rises from -1 to +1; PolyBLEP smooths the wrap.
    fn sawtooth(&self, inc: f64) -> f64 {
        let naive = 2.0 * self.phase - 1.0;
        naive - poly_blep(self.phase, inc)
    }

    fn square(&self, inc: f64) -> f64 {
        let mut value = if self.phase < 0.5 { 1.0 } else { -1.0 };
        value += poly_blep(self.phase, inc);
        value -= poly_blep((self.phase + 0.5) % 1.0, inc);
        value
    }

    /// Piecewise linear: -1→+1 over [0, 0.5), +1→-1 over [0.5, 1).
    fn triangle(&self) -> f64 {
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }
}

/// PolyBLEP correction around a discontinuity.
///
/// `t` is the phase [0, 1), `dt` is the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_zero_at_start() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 44100.0);
        let sample = osc.next_sample();
        assert!(sample.abs() < 1e-10, "Sine should start near 0, got {sample}");
    }

    #[test]
    fn waveform_ranges() {
        for (waveform, limit) in [
            (Waveform::Sine, 1.0),
            (Waveform::Triangle, 1.0),
            (Waveform::Sawtooth, 1.5),
            (Waveform::Square, 1.5),
        ] {
            let mut osc = Oscillator::new(waveform, 523.25, 44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!(s.abs() <= limit, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn identical_oscillators_render_identically() {
        let mut a = Oscillator::new(Waveform::Sawtooth, 311.13, 44100.0);
        let mut b = Oscillator::new(Waveform::Sawtooth, 311.13, 44100.0);
        for _ in 0..10_000 {
            assert_eq!(a.next_sample().to_bits(), b.next_sample().to_bits());
        }
    }

    #[test]
    fn sine_completes_cycles_at_frequency() {
        // 441 Hz at 44.1 kHz: exactly 100 samples per cycle.
        let mut osc = Oscillator::new(Waveform::Sine, 441.0, 44100.0);
        let mut crossings = 0;
        let mut prev = osc.next_sample();
        for _ in 0..44100 {
            let s = osc.next_sample();
            if prev < 0.0 && s >= 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!((440..=442).contains(&crossings), "got {crossings} rising crossings");
    }
}
