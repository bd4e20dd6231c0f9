//! Offline renderer — the whole series into one buffer, then to WAV.
//!
//! No timers, no wall clock: every note lands at `index × tempo`, so
//! identical inputs always give byte-identical files.

use crate::config::SonifyConfig;
use crate::error::{Result, SonifyError};
use crate::plan::{NotePlan, validate_tempo};
use crate::series::Series;
use crate::style::Style;

use super::mixer::Mixer;
use super::voice::Voice;
use super::wav::{AudioFile, SampleBuffer, encode_wav};

/// Renders complete series to sample buffers and WAV files.
#[derive(Debug, Clone, Default)]
pub struct OfflineRenderer {
    config: SonifyConfig,
}

impl OfflineRenderer {
    pub fn new(config: SonifyConfig) -> Result<Self> {
        config.validate()?;
        Ok(OfflineRenderer { config })
    }

    pub fn config(&self) -> &SonifyConfig {
        &self.config
    }

    /// Frames needed for `notes × tempo + tail` seconds, rounded up.
    ///
    /// Fails with `BufferTooLarge` when the mono 16-bit file would not fit
    /// a RIFF container, before anything is allocated.
    pub fn frames_for(&self, notes: usize, tempo_seconds: f64) -> Result<usize> {
        let seconds = notes as f64 * tempo_seconds + self.config.render_tail_seconds;
        let frames = (seconds * self.config.sample_rate as f64).ceil();
        let bytes = frames * 2.0 + 36.0;
        if !bytes.is_finite() || bytes > u32::MAX as f64 {
            return Err(SonifyError::BufferTooLarge { bytes: bytes as u64 });
        }
        Ok(frames as usize)
    }

    /// Render the series to a mono buffer.
    pub fn render(&self, series: &Series, style: Style, tempo_seconds: f64) -> Result<SampleBuffer> {
        let plan = NotePlan::build(series, style, tempo_seconds, &self.config)?;
        self.render_plan(&plan)
    }

    /// Render a prepared plan. Notes past the end of the buffer are cut.
    pub fn render_plan(&self, plan: &NotePlan) -> Result<SampleBuffer> {
        let sample_rate = self.config.sample_rate as f64;
        let total = self.frames_for(plan.len(), plan.tempo_seconds)?;
        let mut mixer = Mixer::new(self.config.master_gain, total);

        tracing::info!(
            notes = plan.len(),
            frames = total,
            fallback = plan.used_fallback_signal,
            "rendering offline mix"
        );

        for note in &plan.notes {
            let start = start_frame(note.event.start_time_seconds, sample_rate);
            let mut voice = Voice::new(&note.event, sample_rate, self.config.oscillator_tail_seconds);
            mix_voice(&mut mixer, &mut voice, start);
        }

        Ok(SampleBuffer::mono(self.config.sample_rate, mixer.output()))
    }

    /// Render with a style given by name.
    ///
    /// An unrecognized name is a caller bug: debug builds panic, release
    /// builds log it and render silence of the correct length.
    pub fn render_tagged(&self, series: &Series, style: &str, tempo_seconds: f64) -> Result<SampleBuffer> {
        match style.parse::<Style>() {
            Ok(style) => self.render(series, style, tempo_seconds),
            Err(err) => {
                debug_assert!(false, "{err}");
                tracing::error!(style, "unknown style, rendering silence");
                validate_tempo(tempo_seconds)?;
                let total = self.frames_for(series.len(), tempo_seconds)?;
                Ok(SampleBuffer::mono(self.config.sample_rate, vec![0.0; total]))
            }
        }
    }

    /// Render and encode in one step.
    pub fn render_to_file(&self, series: &Series, style: Style, tempo_seconds: f64) -> Result<AudioFile> {
        let buffer = self.render(series, style, tempo_seconds)?;
        let file = encode_wav(buffer)?;
        tracing::info!(bytes = file.len(), %style, "exported WAV");
        Ok(file)
    }
}

/// Sample index of a start time.
fn start_frame(start_time_seconds: f64, sample_rate: f64) -> usize {
    (start_time_seconds * sample_rate).round() as usize
}

fn mix_voice(mixer: &mut Mixer, voice: &mut Voice, start: usize) {
    let end = (start + voice.len()).min(mixer.len());
    for index in start..end {
        mixer.add(index, voice.next_sample());
    }
}

/// Render with the default configuration and encode.
pub fn render_wav(series: &Series, style: Style, tempo_seconds: f64) -> Result<AudioFile> {
    OfflineRenderer::default().render_to_file(series, style, tempo_seconds)
}
