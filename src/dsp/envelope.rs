//! Parameter automation — a small AudioParam-style timeline used for
//! gain envelopes and filter sweeps.
//!
//! Times are seconds relative to the owning voice's start, so the same
//! timeline renders identically live and offline.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Curve {
    /// Jump to the value at the given time.
    Set,
    /// Linear ramp from the previous event.
    Linear,
    /// Exponential ramp from the previous event.
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    time: f64,
    value: f64,
    curve: Curve,
}

/// A parameter timeline. Events must be added in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct Automation {
    initial: f64,
    points: Vec<Point>,
}

impl Automation {
    /// A parameter holding `initial` until the first event.
    pub fn new(initial: f64) -> Self {
        Automation {
            initial,
            points: Vec::new(),
        }
    }

    pub fn constant(value: f64) -> Self {
        Automation::new(value)
    }

    pub fn set_value_at(mut self, time: f64, value: f64) -> Self {
        self.push(time, value, Curve::Set);
        self
    }

    pub fn linear_ramp_to(mut self, time: f64, value: f64) -> Self {
        self.push(time, value, Curve::Linear);
        self
    }

    /// Exponential ramp. As in WebAudio, a ramp starting from zero (or
    /// crossing zero) holds the previous value until its end time.
    pub fn exponential_ramp_to(mut self, time: f64, value: f64) -> Self {
        self.push(time, value, Curve::Exponential);
        self
    }

    fn push(&mut self, time: f64, value: f64, curve: Curve) {
        debug_assert!(
            self.points.last().is_none_or(|p| p.time <= time),
            "automation events must be added in time order"
        );
        self.points.push(Point { time, value, curve });
    }

    /// Value at `t` seconds.
    pub fn value_at(&self, t: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for p in &self.points {
            if t < p.time {
                let span = p.time - prev_time;
                return match p.curve {
                    Curve::Set => prev_value,
                    _ if span <= 0.0 || t < prev_time => prev_value,
                    Curve::Linear => {
                        prev_value + (p.value - prev_value) * (t - prev_time) / span
                    }
                    Curve::Exponential => {
                        if prev_value == 0.0 || prev_value.signum() != p.value.signum() {
                            prev_value
                        } else {
                            prev_value * (p.value / prev_value).powf((t - prev_time) / span)
                        }
                    }
                };
            }
            prev_time = p.time;
            prev_value = p.value;
        }

        prev_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_holds() {
        let a = Automation::constant(0.4);
        assert_eq!(a.value_at(0.0), 0.4);
        assert_eq!(a.value_at(100.0), 0.4);
    }

    #[test]
    fn linear_attack() {
        let a = Automation::new(0.0).set_value_at(0.0, 0.0).linear_ramp_to(0.02, 0.2);
        assert_eq!(a.value_at(0.0), 0.0);
        assert_relative_eq!(a.value_at(0.01), 0.1, epsilon = 1e-12);
        assert_relative_eq!(a.value_at(0.02), 0.2);
        assert_relative_eq!(a.value_at(1.0), 0.2);
    }

    #[test]
    fn exponential_decay_after_attack() {
        let a = Automation::new(0.0)
            .set_value_at(0.0, 0.0)
            .linear_ramp_to(0.02, 0.2)
            .exponential_ramp_to(0.52, 0.001);
        // halfway through the decay is the geometric mean
        assert_relative_eq!(a.value_at(0.27), (0.2_f64 * 0.001).sqrt(), epsilon = 1e-9);
        assert_relative_eq!(a.value_at(0.52), 0.001);
        assert_relative_eq!(a.value_at(5.0), 0.001);
        let mut prev = a.value_at(0.02);
        for i in 1..=50 {
            let v = a.value_at(0.02 + i as f64 * 0.01);
            assert!(v <= prev, "decay must be monotonic");
            prev = v;
        }
    }

    #[test]
    fn exponential_from_zero_holds() {
        let a = Automation::new(0.0).set_value_at(0.0, 0.0).exponential_ramp_to(1.0, 0.5);
        assert_eq!(a.value_at(0.5), 0.0);
        assert_eq!(a.value_at(1.0), 0.5);
    }

    #[test]
    fn gate_steps() {
        let a = Automation::new(0.0)
            .set_value_at(0.0, 0.0)
            .set_value_at(0.005, 0.15)
            .set_value_at(0.32, 0.15)
            .set_value_at(0.4, 0.0);
        assert_eq!(a.value_at(0.004), 0.0);
        assert_eq!(a.value_at(0.005), 0.15);
        assert_eq!(a.value_at(0.39), 0.15);
        assert_eq!(a.value_at(0.4), 0.0);
    }
}
