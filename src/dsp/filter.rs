//! Low-pass biquad — WebAudio `BiquadFilterNode` lowpass coefficients.

use std::f64::consts::PI;

/// A 2nd-order low-pass IIR filter.
///
/// Direct Form II Transposed; coefficients from the Audio EQ Cookbook
/// (Robert Bristow-Johnson). Resonance is given in dB as in WebAudio,
/// where 0 dB is a plain Q of 1.
#[derive(Debug, Clone)]
pub struct LowpassFilter {
    frequency: f64,
    resonance_db: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
}

impl LowpassFilter {
    pub fn new(frequency: f64, resonance_db: f64, sample_rate: f64) -> Self {
        let mut f = LowpassFilter {
            frequency,
            resonance_db,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
        };
        f.update_coefficients();
        f
    }

    /// Move the cutoff. Coefficients are recomputed only when it changes.
    pub fn set_frequency(&mut self, freq: f64) {
        if freq != self.frequency {
            self.frequency = freq;
            self.update_coefficients();
        }
    }

    fn update_coefficients(&mut self) {
        let nyquist = self.sample_rate / 2.0;
        let cutoff = self.frequency.clamp(1.0, nyquist * 0.999);
        let w0 = 2.0 * PI * cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let q = 10.0_f64.powf(self.resonance_db / 20.0);
        let alpha = w0.sin() / (2.0 * q);

        let b1 = 1.0 - cos_w0;
        let b0 = b1 / 2.0;
        let b2 = b0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_dc() {
        let mut f = LowpassFilter::new(3000.0, 1.0, 44100.0);
        let mut output = 0.0;
        for _ in 0..2000 {
            output = f.process(1.0);
        }
        assert!((output - 1.0).abs() < 0.001, "Lowpass should pass DC, got {output}");
    }

    #[test]
    fn attenuates_high_freq() {
        let mut f = LowpassFilter::new(200.0, 0.0, 44100.0);
        let freq = 10000.0;
        let mut max_out = 0.0_f64;
        for i in 0..4410 {
            let t = i as f64 / 44100.0;
            let out = f.process((2.0 * PI * freq * t).sin());
            if i > 1000 {
                max_out = max_out.max(out.abs());
            }
        }
        assert!(max_out < 0.01, "Lowpass@200Hz should strongly attenuate 10kHz, got {max_out}");
    }

    #[test]
    fn resonance_boosts_cutoff() {
        let gain_at_cutoff = |resonance_db: f64| {
            let mut f = LowpassFilter::new(1000.0, resonance_db, 44100.0);
            let mut peak = 0.0_f64;
            for i in 0..44100 {
                let t = i as f64 / 44100.0;
                let out = f.process((2.0 * PI * 1000.0 * t).sin());
                if i > 22050 {
                    peak = peak.max(out.abs());
                }
            }
            peak
        };
        assert!(gain_at_cutoff(5.0) > gain_at_cutoff(0.0) * 1.5);
    }

    #[test]
    fn cutoff_above_nyquist_stays_finite() {
        let mut f = LowpassFilter::new(30_000.0, 5.0, 44100.0);
        for i in 0..10_000 {
            let input = if i % 100 == 0 { 1.0 } else { 0.0 };
            assert!(f.process(input).is_finite(), "Filter output not finite at sample {i}");
        }
    }
}
