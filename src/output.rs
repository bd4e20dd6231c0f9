//! Live output — the master bus feeding an audio device.
//!
//! The control side ([`MasterOutput`]) hands voices to the render side
//! ([`LiveMix`]) over a lock-free channel. The render side runs wherever
//! the device pulls samples (usually its own callback thread) and
//! advances a shared frame clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};

use crate::config::SonifyConfig;
use crate::dsp::voice::Voice;
use crate::error::{Result, SonifyError};
use crate::plan::NoteEvent;

/// Power state of an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Present but not producing sound (e.g. waiting on a user gesture).
    Suspended,
    Running,
    /// Could not be opened.
    Unavailable,
}

impl DeviceState {
    pub fn is_active(&self) -> bool {
        *self == DeviceState::Running
    }
}

/// An audio sink that pulls blocks from a [`LiveMix`].
pub trait OutputDevice {
    fn sample_rate(&self) -> u32;

    /// Take ownership of the render side. Called once the first time the
    /// master output is resumed; on error it is retried on the next resume.
    fn open(&mut self, mix: LiveMix) -> Result<()>;

    /// Ask the device to start (or restart) producing sound.
    fn resume(&mut self) -> DeviceState;

    fn state(&self) -> DeviceState;
}

struct ScheduledVoice {
    start_frame: u64,
    voice: Voice,
}

/// Render side of the master bus.
pub struct LiveMix {
    incoming: Receiver<ScheduledVoice>,
    active: Vec<ScheduledVoice>,
    clock: Arc<AtomicU64>,
    master_gain: f64,
}

impl LiveMix {
    /// Fill `out` with the next block of mono samples and advance the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        let block_start = self.clock.load(Ordering::Acquire);
        self.active.extend(self.incoming.try_iter());

        for (i, slot) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;
            let mut sum = 0.0;
            for v in self.active.iter_mut() {
                if frame >= v.start_frame {
                    sum += v.voice.next_sample();
                }
            }
            *slot = (sum * self.master_gain) as f32;
        }

        self.active.retain(|v| !v.voice.is_finished());
        self.clock.store(block_start + out.len() as u64, Ordering::Release);
    }

    /// Voices still sounding.
    pub fn active_voices(&self) -> usize {
        self.active.len()
    }
}

/// Control side of the master bus: one per player, opened lazily and
/// resumed before every use.
pub struct MasterOutput<D: OutputDevice> {
    device: D,
    link: Option<Sender<ScheduledVoice>>,
    clock: Arc<AtomicU64>,
    master_gain: f64,
    oscillator_tail: f64,
}

impl<D: OutputDevice> MasterOutput<D> {
    /// Wrap a device. Nothing is opened until [`MasterOutput::resume`].
    pub fn new(device: D, config: &SonifyConfig) -> Self {
        MasterOutput {
            device,
            link: None,
            clock: Arc::new(AtomicU64::new(0)),
            master_gain: config.master_gain,
            oscillator_tail: config.oscillator_tail_seconds,
        }
    }

    /// Open the device on first use, then bring it out of suspension.
    pub fn resume(&mut self) -> DeviceState {
        if self.link.is_none() {
            let (tx, rx) = crossbeam_channel::unbounded();
            let mix = LiveMix {
                incoming: rx,
                active: Vec::new(),
                clock: Arc::clone(&self.clock),
                master_gain: self.master_gain,
            };
            if let Err(e) = self.device.open(mix) {
                tracing::warn!(error = %e, "output device could not be opened");
                return DeviceState::Unavailable;
            }
            tracing::debug!(sample_rate = self.device.sample_rate(), "output device opened");
            self.link = Some(tx);
        }

        match self.device.state() {
            DeviceState::Running => DeviceState::Running,
            _ => {
                let state = self.device.resume();
                if !state.is_active() {
                    tracing::info!(?state, "output device not yet active");
                }
                state
            }
        }
    }

    pub fn state(&self) -> DeviceState {
        if self.link.is_none() {
            DeviceState::Suspended
        } else {
            self.device.state()
        }
    }

    /// Device time in seconds: frames rendered so far.
    pub fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.device.sample_rate() as f64
    }

    /// Start a note now. Dropped silently unless the device is running.
    pub fn trigger(&self, event: &NoteEvent) -> DeviceState {
        let state = self.state();
        let Some(tx) = self.link.as_ref().filter(|_| state.is_active()) else {
            return state;
        };
        let voice = Voice::new(event, self.device.sample_rate() as f64, self.oscillator_tail);
        let start_frame = self.clock.load(Ordering::Acquire);
        if tx.send(ScheduledVoice { start_frame, voice }).is_err() {
            tracing::warn!("output device dropped its mix");
            return DeviceState::Unavailable;
        }
        state
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}

struct ManualShared {
    mix: Option<LiveMix>,
    state: DeviceState,
    blocked: bool,
}

/// An in-process device whose samples are pulled explicitly through a
/// [`ManualHandle`]. Starts suspended.
pub struct ManualDevice {
    sample_rate: u32,
    shared: Arc<Mutex<ManualShared>>,
}

/// Caller's side of a [`ManualDevice`].
#[derive(Clone)]
pub struct ManualHandle {
    shared: Arc<Mutex<ManualShared>>,
}

impl ManualDevice {
    pub fn new(sample_rate: u32) -> (Self, ManualHandle) {
        let shared = Arc::new(Mutex::new(ManualShared {
            mix: None,
            state: DeviceState::Suspended,
            blocked: false,
        }));
        (
            ManualDevice {
                sample_rate,
                shared: Arc::clone(&shared),
            },
            ManualHandle { shared },
        )
    }

    fn with_shared<T>(&self, f: impl FnOnce(&mut ManualShared) -> T) -> Result<T> {
        let mut guard = self
            .shared
            .lock()
            .map_err(|_| SonifyError::Device("manual device state poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl OutputDevice for ManualDevice {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn open(&mut self, mix: LiveMix) -> Result<()> {
        self.with_shared(|s| s.mix = Some(mix))
    }

    fn resume(&mut self) -> DeviceState {
        self.with_shared(|s| {
            if !s.blocked {
                s.state = DeviceState::Running;
            }
            s.state
        })
        .unwrap_or(DeviceState::Unavailable)
    }

    fn state(&self) -> DeviceState {
        self.with_shared(|s| s.state).unwrap_or(DeviceState::Unavailable)
    }
}

impl ManualHandle {
    /// Render `frames` samples. Silence if the device is not running.
    pub fn pull(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        if let Ok(mut s) = self.shared.lock() {
            if s.state.is_active() {
                if let Some(mix) = s.mix.as_mut() {
                    mix.render(&mut out);
                }
            }
        }
        out
    }

    /// Refuse (or allow) resumes, as a platform waiting on a user gesture would.
    pub fn set_blocked(&self, blocked: bool) {
        if let Ok(mut s) = self.shared.lock() {
            s.blocked = blocked;
        }
    }

    /// Drop back to suspended, as an OS power manager might.
    pub fn suspend(&self) {
        if let Ok(mut s) = self.shared.lock() {
            s.state = DeviceState::Suspended;
        }
    }

    pub fn active_voices(&self) -> usize {
        self.shared
            .lock()
            .ok()
            .and_then(|s| s.mix.as_ref().map(LiveMix::active_voices))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::renderer::OfflineRenderer;
    use crate::plan::NotePlan;
    use crate::series::{Series, point};
    use crate::style::Style;

    fn event(style: Style) -> NoteEvent {
        NoteEvent {
            frequency_hz: 392.0,
            start_time_seconds: 0.0,
            style,
            note_duration_seconds: 0.25,
        }
    }

    #[test]
    fn opens_lazily_and_resumes() {
        let (device, handle) = ManualDevice::new(44100);
        let mut out = MasterOutput::new(device, &SonifyConfig::default());
        assert_eq!(out.state(), DeviceState::Suspended);
        assert_eq!(out.resume(), DeviceState::Running);

        handle.suspend();
        assert_eq!(out.state(), DeviceState::Suspended);
        assert_eq!(out.resume(), DeviceState::Running);
    }

    #[test]
    fn blocked_device_drops_notes() {
        let (device, handle) = ManualDevice::new(44100);
        handle.set_blocked(true);
        let mut out = MasterOutput::new(device, &SonifyConfig::default());
        assert_eq!(out.resume(), DeviceState::Suspended);
        assert_eq!(out.trigger(&event(Style::Retro)), DeviceState::Suspended);
        assert!(handle.pull(512).iter().all(|&s| s == 0.0));
        assert_eq!(handle.active_voices(), 0);

        handle.set_blocked(false);
        assert_eq!(out.resume(), DeviceState::Running);
        assert_eq!(out.trigger(&event(Style::Retro)), DeviceState::Running);
        let block = handle.pull(4410);
        assert!(block.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn clock_advances_with_pulled_frames() {
        let (device, handle) = ManualDevice::new(44100);
        let mut out = MasterOutput::new(device, &SonifyConfig::default());
        out.resume();
        handle.pull(22050);
        assert!((out.current_time() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn finished_voices_are_released() {
        let (device, handle) = ManualDevice::new(44100);
        let mut out = MasterOutput::new(device, &SonifyConfig::default());
        out.resume();
        out.trigger(&event(Style::Cyberpunk));
        handle.pull(128);
        assert_eq!(handle.active_voices(), 1);
        // 0.25 s note + 0.5 s tail
        handle.pull(44100);
        assert_eq!(handle.active_voices(), 0);
    }

    #[test]
    fn live_mix_matches_offline_render() {
        let series = Series::new(vec![point(1, 3.0, 0.5), point(2, 7.0, 0.9), point(3, 1.0, 0.6)]).unwrap();
        let config = SonifyConfig::default();
        let plan = NotePlan::build(&series, Style::Ethereal, 0.25, &config).unwrap();
        let offline = OfflineRenderer::new(config.clone()).unwrap().render_plan(&plan).unwrap();

        let (device, handle) = ManualDevice::new(config.sample_rate);
        let mut out = MasterOutput::new(device, &config);
        out.resume();
        let step = (0.25 * config.sample_rate as f64) as usize;
        let mut live = Vec::new();
        for note in &plan.notes {
            out.trigger(&note.event);
            live.extend(handle.pull(step));
        }
        live.extend(handle.pull(offline.samples.len() - live.len()));

        assert_eq!(live.len(), offline.samples.len());
        assert!(live.iter().zip(&offline.samples).all(|(a, b)| a.to_bits() == b.to_bits() || (*a == 0.0 && *b == 0.0)));
    }
}
