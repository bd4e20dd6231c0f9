//! Mixer — sums voice outputs into one bus with a master gain.

/// A summing bus over a fixed number of frames.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(master_gain: f64, num_samples: usize) -> Self {
        Mixer {
            master_gain,
            buffer: vec![0.0; num_samples],
        }
    }

    /// Add a sample at the given index. Samples past the end are dropped.
    pub fn add(&mut self, index: usize, sample: f64) {
        if let Some(slot) = self.buffer.get_mut(index) {
            *slot += sample;
        }
    }

    /// The mixed bus with master gain applied.
    pub fn output(&self) -> Vec<f32> {
        self.buffer
            .iter()
            .map(|&s| (s * self.master_gain) as f32)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
