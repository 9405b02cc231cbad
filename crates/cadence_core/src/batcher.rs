//! Render batcher
//!
//! Drives the eight render phases once per batch, in a fixed order. The
//! batcher never owns a timer: when it has work it asks the host to run it
//! through a continuation, and it keeps asking for as long as keep-alive
//! callbacks request another frame.

use crate::clock::SyncClock;
use crate::frame::{FrameData, Phase, DEFAULT_FRAME_DELTA_MS};
use crate::render_step::{FrameProcess, RenderStep};
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Zero-argument continuation that runs one batch when invoked
pub type BatchContinuation = Box<dyn FnOnce()>;

/// Host hook that arranges for a continuation to run on its next tick
pub type ScheduleNextBatch = Box<dyn Fn(BatchContinuation)>;

/// Batcher configuration
#[derive(Clone, Copy, Debug)]
pub struct BatcherConfig {
    /// Whether work requesting another frame keeps the batcher scheduled
    pub allow_keep_alive: bool,
    /// Delta used for the first batch after waking up
    pub default_delta_ms: f64,
    /// Lower bound of measured deltas
    pub min_delta_ms: f64,
    /// Upper bound of measured deltas
    pub max_delta_ms: f64,
}

impl BatcherConfig {
    pub fn new() -> Self {
        Self {
            allow_keep_alive: true,
            default_delta_ms: DEFAULT_FRAME_DELTA_MS,
            min_delta_ms: 1.0,
            max_delta_ms: 40.0,
        }
    }

    /// Disable keep-alive rescheduling
    pub fn without_keep_alive(mut self) -> Self {
        self.allow_keep_alive = false;
        self
    }

    /// Clamp range applied to measured deltas
    pub fn delta_bounds(mut self, min_ms: f64, max_ms: f64) -> Self {
        self.min_delta_ms = min_ms;
        self.max_delta_ms = max_ms;
        self
    }
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

struct BatcherInner {
    steps: [RenderStep; 8],
    state: Cell<FrameData>,
    run_next_frame: Rc<Cell<bool>>,
    use_default_elapsed: Cell<bool>,
    config: BatcherConfig,
    clock: SyncClock,
    schedule_next_batch: ScheduleNextBatch,
}

/// Owns one render step per phase and runs them in order
#[derive(Clone)]
pub struct RenderBatcher {
    inner: Rc<BatcherInner>,
}

impl RenderBatcher {
    /// Create a batcher
    ///
    /// `schedule_next_batch` is called with a continuation whenever the
    /// batcher needs to run again; the host must invoke it on its next tick.
    /// Continuations read the time from `clock`.
    pub fn new<F>(clock: SyncClock, config: BatcherConfig, schedule_next_batch: F) -> Self
    where
        F: Fn(BatchContinuation) + 'static,
    {
        let run_next_frame = Rc::new(Cell::new(false));
        let steps = Phase::ALL.map(|_| RenderStep::new(run_next_frame.clone()));

        Self {
            inner: Rc::new(BatcherInner {
                steps,
                state: Cell::new(FrameData {
                    delta: 0.0,
                    now: 0.0,
                    is_processing: false,
                }),
                run_next_frame,
                use_default_elapsed: Cell::new(true),
                config,
                clock,
                schedule_next_batch: Box::new(schedule_next_batch),
            }),
        }
    }

    /// Schedule a callback in the given phase, waking the batcher if idle
    pub fn schedule(
        &self,
        phase: Phase,
        process: FrameProcess,
        keep_alive: bool,
        immediate: bool,
    ) -> FrameProcess {
        if !self.inner.run_next_frame.get() {
            self.wake();
        }
        self.step(phase).schedule(process, keep_alive, immediate)
    }

    /// Schedule a plain closure for the next frame of `phase`
    pub fn schedule_fn<F>(&self, phase: Phase, f: F) -> FrameProcess
    where
        F: Fn(&FrameData) + 'static,
    {
        self.schedule(phase, FrameProcess::new(f), false, false)
    }

    /// Cancel a callback in every phase
    pub fn cancel(&self, process: &FrameProcess) {
        for step in &self.inner.steps {
            step.cancel(process);
        }
    }

    /// The render step of a phase
    pub fn step(&self, phase: Phase) -> &RenderStep {
        &self.inner.steps[phase.index()]
    }

    /// Frame data of the most recent (or running) batch
    pub fn frame_data(&self) -> FrameData {
        self.inner.state.get()
    }

    /// Whether another batch has been requested
    pub fn is_scheduled(&self) -> bool {
        self.inner.run_next_frame.get()
    }

    fn wake(&self) {
        self.inner.run_next_frame.set(true);
        self.inner.use_default_elapsed.set(true);

        if !self.inner.state.get().is_processing {
            self.request_batch();
        }
    }

    fn request_batch(&self) {
        let weak: Weak<BatcherInner> = Rc::downgrade(&self.inner);
        (self.inner.schedule_next_batch)(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                let batcher = RenderBatcher { inner };
                let timestamp = batcher.inner.clock.now();
                batcher.process_batch(timestamp);
            }
        }));
    }

    /// Run every phase once for `timestamp` (milliseconds)
    pub fn process_batch(&self, timestamp: f64) {
        let inner = &self.inner;
        let config = &inner.config;
        inner.run_next_frame.set(false);

        let mut state = inner.state.get();
        state.delta = if inner.use_default_elapsed.get() {
            config.default_delta_ms
        } else {
            (timestamp - state.now).clamp(config.min_delta_ms, config.max_delta_ms)
        };
        state.now = timestamp;
        state.is_processing = true;
        inner.state.set(state);

        for step in &inner.steps {
            step.process(&state);
        }

        state.is_processing = false;
        inner.state.set(state);

        if inner.run_next_frame.get() && config.allow_keep_alive {
            tracing::trace!(delta = state.delta, "RenderBatcher: keep-alive, scheduling next batch");
            inner.use_default_elapsed.set(false);
            self.request_batch();
        } else {
            // No batch requested; the next schedule wakes the host
            inner.run_next_frame.set(false);
        }
    }
}
