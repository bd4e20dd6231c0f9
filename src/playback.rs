//! Live playback — note-by-note triggering paced by a timer.
//!
//! [`Sequencer`] is the pure state machine; [`Player`] drives it from a
//! tokio timer on the current thread's `LocalSet`.

use crate::plan::{NotePlan, PlannedNote};

/// Where a sequencer is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    /// Cancelled before reaching the end.
    Stopped,
}

/// Outcome of one sequencer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Sound this note now, then wait one tempo period.
    Note(PlannedNote),
    /// The cursor reached the end; the run is over.
    Complete,
    /// Not playing; nothing to do.
    Inactive,
}

/// Cursor over a note plan: Idle → Playing → (Idle | Stopped).
#[derive(Debug, Clone)]
pub struct Sequencer {
    notes: Vec<PlannedNote>,
    cursor: usize,
    state: PlaybackState,
}

impl Default for Sequencer {
    fn default() -> Self {
        Sequencer {
            notes: Vec::new(),
            cursor: 0,
            state: PlaybackState::Idle,
        }
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run, discarding any previous one.
    pub fn start(&mut self, plan: NotePlan) {
        self.notes = plan.notes;
        self.cursor = 0;
        self.state = PlaybackState::Playing;
    }

    pub fn step(&mut self) -> Step {
        if self.state != PlaybackState::Playing {
            return Step::Inactive;
        }
        match self.notes.get(self.cursor) {
            Some(note) => {
                self.cursor += 1;
                Step::Note(*note)
            }
            None => {
                self.state = PlaybackState::Idle;
                Step::Complete
            }
        }
    }

    /// Cancel a running sequence. Returns false (and changes nothing) if
    /// it was not playing.
    pub fn stop(&mut self) -> bool {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Stopped;
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the next note to sound.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(feature = "playback")]
pub use player::Player;

#[cfg(feature = "playback")]
mod player {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use tokio::task::JoinHandle;

    use super::{PlaybackState, Sequencer, Step};
    use crate::config::SonifyConfig;
    use crate::error::{Result, SonifyError};
    use crate::output::{DeviceState, MasterOutput, OutputDevice};
    use crate::plan::NotePlan;
    use crate::series::Series;
    use crate::style::Style;

    struct Inner<D: OutputDevice> {
        output: MasterOutput<D>,
        sequencer: Sequencer,
        /// Bumped on every start and stop; a task only acts while its
        /// generation is current.
        generation: u64,
        task: Option<JoinHandle<()>>,
    }

    /// Real-time player over one output device.
    ///
    /// Steps run on the current thread via `tokio::task::spawn_local`.
    /// Callbacks may call back into the player (e.g. `stop` from `on_note`).
    ///
    /// # Panics
    ///
    /// `play` must be called from a task inside a `tokio::task::LocalSet`.
    /// Outside any tokio runtime it returns `SonifyError::Device`; inside a
    /// runtime but outside a `LocalSet`, tokio panics.
    pub struct Player<D: OutputDevice + 'static> {
        inner: Rc<RefCell<Inner<D>>>,
        config: SonifyConfig,
    }

    impl<D: OutputDevice + 'static> Player<D> {
        pub fn new(device: D, config: SonifyConfig) -> Result<Self> {
            config.validate()?;
            let inner = Inner {
                output: MasterOutput::new(device, &config),
                sequencer: Sequencer::new(),
                generation: 0,
                task: None,
            };
            Ok(Player {
                inner: Rc::new(RefCell::new(inner)),
                config,
            })
        }

        /// Start playing `series`, one note every `tempo_seconds`.
        ///
        /// Any current run is cancelled first. `on_note(i)` fires as note
        /// `i` is triggered; `on_complete` fires once after the last note's
        /// period has elapsed, and never if the run is stopped. Returns the
        /// device state: anything but `Running` means the schedule runs
        /// silently until the device becomes available.
        pub fn play<N, C>(
            &self,
            series: &Series,
            style: Style,
            tempo_seconds: f64,
            mut on_note: N,
            on_complete: C,
        ) -> Result<DeviceState>
        where
            N: FnMut(usize) + 'static,
            C: FnOnce() + 'static,
        {
            let plan = NotePlan::build(series, style, tempo_seconds, &self.config)?;
            let period =
                Duration::try_from_secs_f64(tempo_seconds).map_err(|_| SonifyError::InvalidTempo(tempo_seconds))?;
            if tokio::runtime::Handle::try_current().is_err() {
                return Err(SonifyError::Device("playback needs a tokio runtime with a LocalSet".into()));
            }
            self.stop();

            let mut inner = self.inner.borrow_mut();
            let device_state = inner.output.resume();
            inner.generation += 1;
            let generation = inner.generation;
            tracing::info!(notes = plan.len(), %style, tempo_seconds, ?device_state, "playback started");
            inner.sequencer.start(plan);

            let shared = Rc::clone(&self.inner);
            let task = tokio::task::spawn_local(async move {
                let mut on_complete = Some(on_complete);
                loop {
                    let step = {
                        let mut inner = shared.borrow_mut();
                        if inner.generation != generation {
                            return;
                        }
                        let step = inner.sequencer.step();
                        match step {
                            Step::Note(note) => {
                                let mut event = note.event;
                                if !inner.output.state().is_active() {
                                    inner.output.resume();
                                }
                                event.start_time_seconds = inner.output.current_time();
                                inner.output.trigger(&event);
                            }
                            Step::Complete => {
                                inner.task = None;
                            }
                            Step::Inactive => {}
                        }
                        step
                    };

                    match step {
                        Step::Note(note) => on_note(note.index),
                        Step::Complete => {
                            tracing::debug!("playback complete");
                            if let Some(done) = on_complete.take() {
                                done();
                            }
                            return;
                        }
                        Step::Inactive => return,
                    }

                    // on_note may have stopped or restarted playback
                    if shared.borrow().generation != generation {
                        return;
                    }
                    tokio::time::sleep(period).await;
                }
            });
            inner.task = Some(task);

            Ok(device_state)
        }

        /// Cancel playback. No note or completion callback fires after this
        /// returns. Calling it while idle does nothing.
        pub fn stop(&self) {
            let mut inner = self.inner.borrow_mut();
            let Some(task) = inner.task.take() else {
                return;
            };
            inner.generation += 1;
            inner.sequencer.stop();
            task.abort();
            tracing::debug!(cursor = inner.sequencer.cursor(), "playback stopped");
        }

        pub fn state(&self) -> PlaybackState {
            self.inner.borrow().sequencer.state()
        }

        /// Index of the next note to sound.
        pub fn position(&self) -> usize {
            self.inner.borrow().sequencer.cursor()
        }

        pub fn device_state(&self) -> DeviceState {
            self.inner.borrow().output.state()
        }
    }

    impl<D: OutputDevice + 'static> Drop for Player<D> {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
