//! # Tuner Engine
//!
//! Owns the analysis pipeline and the current note, and connects them to an
//! external capture source and a note observer.
//!
//! ## Threading
//! Capture sources deliver blocks through a [`BlockSink`] from whatever thread
//! they run on. Every cycle runs under one lock, so at most one cycle touches
//! the sample window at a time, and observers are notified under that same
//! lock in the order the notes were produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};

use crate::ClosestNote;
use crate::config::{CaptureFormat, TunerConfig};
use crate::error::ConfigResult;
use crate::pipeline::{CycleOutcome, Pipeline};

/// Receives note changes.
///
/// Called on the thread that ran the detecting cycle. Implementations must
/// not push samples into the engine that notifies them.
pub trait NoteObserver: Send + Sync {
    fn note_changed(&self, note: Option<&ClosestNote>);
}

/// Closures are called synchronously.
impl<F> NoteObserver for F
where
    F: Fn(Option<&ClosestNote>) + Send + Sync,
{
    fn note_changed(&self, note: Option<&ClosestNote>) {
        self(note)
    }
}

/// Hands note changes to another thread, e.g. a UI loop draining the receiver.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<Option<ClosestNote>>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<Option<ClosestNote>>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }
}

impl NoteObserver for ChannelObserver {
    fn note_changed(&self, note: Option<&ClosestNote>) {
        if self.sender.send(note.cloned()).is_err() {
            debug!("Note receiver dropped, discarding notification");
        }
    }
}

/// An audio input that delivers 16-bit mono blocks to the engine.
pub trait CaptureSource: Send {
    /// Begins delivering blocks in `format` to `sink`.
    fn start(&mut self, format: &CaptureFormat, sink: BlockSink) -> anyhow::Result<()>;
    /// Stops delivering blocks. Must not fail.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
}

struct Shared {
    running: AtomicBool,
    /// Set by `start`; the next cycle empties the window before running.
    reset_pending: AtomicBool,
    pipeline: Mutex<Pipeline>,
    current: Mutex<Option<ClosestNote>>,
    observer: Box<dyn NoteObserver>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn run_cycle(&self, cycle: impl FnOnce(&mut Pipeline) -> CycleOutcome) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let mut pipeline = lock(&self.pipeline);
        // stop() may have taken the lock first.
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        if self.reset_pending.swap(false, Ordering::AcqRel) {
            pipeline.reset();
        }

        match cycle(&mut pipeline) {
            CycleOutcome::Dropped => warn!("Dropped empty or malformed sample block"),
            CycleOutcome::Stable(note) => self.publish(note),
            _ => {}
        }
    }

    fn publish(&self, note: ClosestNote) {
        {
            let mut current = lock(&self.current);
            if current.as_ref() == Some(&note) {
                return;
            }
            *current = Some(note.clone());
        }
        info!(
            "Note: {}, Max Frequency: {} Hz, Closest Pitch: {} Hz",
            note.note, note.max_frequency, note.closest_pitch
        );
        self.observer.note_changed(Some(&note));
    }
}

/// Feeds captured blocks into a running engine.
///
/// Blocks pushed while the engine is idle are ignored.
#[derive(Clone)]
pub struct BlockSink {
    shared: Arc<Shared>,
}

impl BlockSink {
    /// Pushes a little-endian 16-bit PCM byte buffer of which the first
    /// `bytes_recorded` bytes are valid.
    pub fn push_bytes(&self, buffer: &[u8], bytes_recorded: usize) {
        self.shared
            .run_cycle(|pipeline| pipeline.process_bytes(buffer, bytes_recorded));
    }

    /// Pushes a block of 16-bit samples.
    pub fn push_samples(&self, samples: &[i16]) {
        self.shared
            .run_cycle(|pipeline| pipeline.process_block(samples));
    }
}

/// The tuner: detects the note being played and reports stable changes.
pub struct Tuner {
    config: TunerConfig,
    shared: Arc<Shared>,
    capture: Box<dyn CaptureSource>,
}

impl Tuner {
    pub fn new(
        config: TunerConfig,
        capture: impl CaptureSource + 'static,
        observer: impl NoteObserver + 'static,
    ) -> ConfigResult<Self> {
        let pipeline = Pipeline::new(config.clone())?;
        Ok(Self {
            config,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                reset_pending: AtomicBool::new(false),
                pipeline: Mutex::new(pipeline),
                current: Mutex::new(None),
                observer: Box::new(observer),
            }),
            capture: Box::new(capture),
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Starts capturing. Does nothing if already running.
    ///
    /// The first cycle after starting analyses a fresh, empty window.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.shared.reset_pending.store(true, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let format = self.config.capture_format();
        if let Err(e) = self.capture.start(&format, self.sink()) {
            self.shared.running.store(false, Ordering::Release);
            return Err(e);
        }
        info!(
            "Tuner started: {} Hz, {} bit, {} channel(s), {} ms blocks",
            format.sample_rate, format.bits_per_sample, format.channels, format.buffer_duration_ms
        );
        Ok(())
    }

    /// Stops capturing and clears the current note. Does nothing if idle.
    ///
    /// A cycle already in flight finishes before the note is cleared.
    pub fn stop(&mut self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.capture.stop();

        let _pipeline = lock(&self.shared.pipeline);
        *lock(&self.shared.current) = None;
        self.shared.observer.note_changed(None);
        info!("Tuner stopped");
    }

    pub fn state(&self) -> EngineState {
        if self.is_running() {
            EngineState::Running
        } else {
            EngineState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// The last stable note, or `None` before the first detection and after `stop`.
    pub fn current_note(&self) -> Option<ClosestNote> {
        lock(&self.shared.current).clone()
    }

    /// A handle for delivering blocks, e.g. from a host-owned capture callback.
    pub fn sink(&self) -> BlockSink {
        BlockSink {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for Tuner {
    fn drop(&mut self) {
        self.stop();
    }
}
