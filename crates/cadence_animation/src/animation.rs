//! Value animations
//!
//! A [`ValueAnimation`] binds one generator to one motion value and owns the
//! playback state machine:
//!
//! ```text
//! Idle ──play──▶ Running ──pause──▶ Paused
//!                  │  ▲                │
//!                  │  └──────play──────┘
//!                  ▼
//!               Finished ──play──▶ Running (from zero)
//! ```
//!
//! `stop` and `cancel` return any state to Idle. Time only advances through
//! [`ValueAnimation::update`], which the motion system calls once per tick
//! with the frame delta.
//!
//! # Example
//!
//! ```
//! use cadence_animation::{Keyframes, KeyframesOptions, PlayState, ValueAnimation};
//! use cadence_core::{MotionValue, SyncClock};
//!
//! let clock = SyncClock::new();
//! let x = MotionValue::new(&clock, 0.0_f64);
//!
//! let keyframes = Keyframes::new(vec![0.0, 100.0], KeyframesOptions::new(200.0)).unwrap();
//! let animation = ValueAnimation::new(&x, keyframes).unwrap();
//!
//! animation.play();
//! animation.update(100.0);
//! assert_eq!(x.get(), 50.0);
//!
//! animation.update(100.0);
//! assert_eq!(animation.state(), PlayState::Finished);
//! assert!(animation.finished().is_resolved());
//! ```

use crate::completion::CompletionHandle;
use crate::generator::KeyframeGenerator;
use cadence_core::{
    ActiveAnimation, AnimationOutcome, ControllerId, FrameData, MotionController, MotionError,
    MotionSystem, MotionType, MotionValue, Result, SyncClock, WeakMotionValue,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(1);

/// Playback state of a value animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

struct Timing {
    /// Elapsed generator time (ms)
    time: f64,
    start_time: Option<f64>,
    hold_time: Option<f64>,
    speed: f64,
    state: PlayState,
    /// Stopped or cancelled since the last play
    halted: bool,
}

type UpdateCallback<T> = Rc<dyn Fn(&T)>;
type EventCallback = Rc<dyn Fn()>;

struct AnimationInner<T: MotionType> {
    id: u64,
    generator: Box<dyn KeyframeGenerator<T>>,
    target: WeakMotionValue<T>,
    clock: SyncClock,
    bypass_effect: Cell<bool>,
    timing: RefCell<Timing>,
    completion: RefCell<CompletionHandle>,
    controller: Cell<Option<ControllerId>>,
    on_update: RefCell<Option<UpdateCallback<T>>>,
    on_complete: RefCell<Option<EventCallback>>,
    on_cancel: RefCell<Option<EventCallback>>,
}

impl<T: MotionType> AnimationInner<T> {
    fn state(&self) -> PlayState {
        self.timing.borrow().state
    }

    fn push(&self, value: T) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        if self.bypass_effect.get() {
            target.committer().commit(value);
        } else {
            target.set(value);
        }
    }

    fn halt(&self) {
        {
            let mut timing = self.timing.borrow_mut();
            if timing.state == PlayState::Idle {
                return;
            }
            timing.state = PlayState::Idle;
            timing.time = 0.0;
            timing.start_time = None;
            timing.hold_time = None;
            timing.halted = true;
        }

        let completion = self.completion.borrow().clone();
        completion.cancel();

        if let Some(target) = self.target.upgrade() {
            target.finish_animation(self.id, AnimationOutcome::Cancelled);
        }
    }

    fn complete(&self) {
        if self.state() == PlayState::Finished {
            return;
        }

        let duration = self.generator.resolved_duration();
        let value = self.generator.next(duration).value;
        {
            let mut timing = self.timing.borrow_mut();
            timing.time = duration;
            timing.hold_time = None;
            timing.state = PlayState::Finished;
        }

        self.push(value);
        // A change listener may have stopped or restarted the animation
        if self.state() != PlayState::Finished {
            return;
        }
        tracing::debug!(id = self.id, duration, "ValueAnimation: completed");

        if let Some(target) = self.target.upgrade() {
            target.finish_animation(self.id, AnimationOutcome::Completed);
        }
        let completion = self.completion.borrow().clone();
        completion.resolve();

        let callback = self.on_complete.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn update(&self, delta: f64) {
        let time = {
            let mut timing = self.timing.borrow_mut();
            if timing.state != PlayState::Running {
                return;
            }
            timing.time = (timing.time + delta * timing.speed).max(0.0);
            timing.time
        };

        let sample = self.generator.next(time);
        self.push(sample.value.clone());

        let callback = self.on_update.borrow().clone();
        if let Some(callback) = callback {
            callback(&sample.value);
        }

        // Callbacks may have paused or stopped the animation
        if sample.done && self.state() == PlayState::Running {
            self.complete();
        }
    }
}

impl<T: MotionType> ActiveAnimation for AnimationInner<T> {
    fn animation_id(&self) -> u64 {
        self.id
    }

    fn stop(&self) {
        self.halt();
    }
}

/// Play/pause/stop controller binding a generator to a motion value
///
/// Cheap to clone; clones control the same animation.
pub struct ValueAnimation<T: MotionType> {
    inner: Rc<AnimationInner<T>>,
}

impl<T: MotionType> Clone for ValueAnimation<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: MotionType> ValueAnimation<T> {
    /// Create an idle animation of `target`
    pub fn new<G>(target: &MotionValue<T>, generator: G) -> Result<Self>
    where
        G: KeyframeGenerator<T> + 'static,
    {
        if target.is_destroyed() {
            return Err(MotionError::InvalidArgument(
                "cannot animate a destroyed motion value".into(),
            ));
        }

        Ok(Self {
            inner: Rc::new(AnimationInner {
                id: NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed),
                generator: Box::new(generator),
                target: target.downgrade(),
                clock: target.clock().clone(),
                bypass_effect: Cell::new(false),
                timing: RefCell::new(Timing {
                    time: 0.0,
                    start_time: None,
                    hold_time: None,
                    speed: 1.0,
                    state: PlayState::Idle,
                    halted: false,
                }),
                completion: RefCell::new(CompletionHandle::new()),
                controller: Cell::new(None),
                on_update: RefCell::new(None),
                on_complete: RefCell::new(None),
                on_cancel: RefCell::new(None),
            }),
        })
    }

    /// Called with every sampled value
    pub fn on_update<F>(self, callback: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        *self.inner.on_update.borrow_mut() = Some(Rc::new(callback));
        self
    }

    /// Called after the final value has been written
    pub fn on_complete<F>(self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        *self.inner.on_complete.borrow_mut() = Some(Rc::new(callback));
        self
    }

    /// Called when the animation is cancelled
    pub fn on_cancel<F>(self, callback: F) -> Self
    where
        F: Fn() + 'static,
    {
        *self.inner.on_cancel.borrow_mut() = Some(Rc::new(callback));
        self
    }

    /// Write samples without going through the target's passive effect
    pub fn bypass_effect(self) -> Self {
        self.inner.bypass_effect.set(true);
        self
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Start or resume playback
    ///
    /// Does nothing while running. A paused animation resumes where it was
    /// paused; a finished one restarts from zero.
    pub fn play(&self) {
        let needs_handle = {
            let mut timing = self.inner.timing.borrow_mut();
            match timing.state {
                PlayState::Running => return,
                PlayState::Paused => {
                    if let Some(hold) = timing.hold_time.take() {
                        timing.time = hold;
                    }
                }
                PlayState::Finished => {
                    timing.time = 0.0;
                    timing.start_time = None;
                    timing.hold_time = None;
                }
                PlayState::Idle => {}
            }

            timing.state = PlayState::Running;
            timing.halted = false;
            if timing.start_time.is_none() {
                timing.start_time = Some(self.inner.clock.now());
                true
            } else {
                false
            }
        };

        if needs_handle && !self.inner.completion.borrow().is_pending() {
            *self.inner.completion.borrow_mut() = CompletionHandle::new();
        }

        if let Some(target) = self.inner.target.upgrade() {
            let active: Rc<dyn ActiveAnimation> = self.inner.clone();
            target.start_animation(active);
        }
    }

    /// Play, registering with `system` so ticks drive the animation
    pub fn play_on(&self, system: &MotionSystem) {
        self.play();

        let registered = self
            .inner
            .controller
            .get()
            .is_some_and(|id| system.contains(id));
        if !registered {
            let id = system.add(Rc::new(self.clone()));
            self.inner.controller.set(Some(id));
        }
    }

    /// Pause a running animation, keeping its time
    pub fn pause(&self) {
        let mut timing = self.inner.timing.borrow_mut();
        if timing.state != PlayState::Running {
            return;
        }
        timing.hold_time = Some(timing.time);
        timing.state = PlayState::Paused;
    }

    /// Return to Idle, clearing timing and cancelling the completion handle
    pub fn stop(&self) {
        self.inner.halt();
    }

    /// Jump to the end: write the final value, resolve, run on-complete
    pub fn complete(&self) {
        self.inner.complete();
    }

    /// Stop and run on-cancel; the value keeps its current contents
    pub fn cancel(&self) {
        if self.state() == PlayState::Idle {
            return;
        }
        self.inner.halt();

        let callback = self.inner.on_cancel.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Advance a running animation by `delta` ms (scaled by speed)
    pub fn update(&self, delta: f64) {
        self.inner.update(delta);
    }

    pub fn state(&self) -> PlayState {
        self.inner.state()
    }

    /// Elapsed generator time (ms)
    pub fn time(&self) -> f64 {
        self.inner.timing.borrow().time
    }

    /// Clock time of the current play (ms)
    pub fn start_time(&self) -> Option<f64> {
        self.inner.timing.borrow().start_time
    }

    /// Move to `time` ms and write the sample there
    pub fn seek(&self, time: f64) {
        let time = time.max(0.0);
        {
            let mut timing = self.inner.timing.borrow_mut();
            timing.time = time;
            if timing.state == PlayState::Paused {
                timing.hold_time = Some(time);
            }
        }
        let value = self.inner.generator.next(time).value;
        self.inner.push(value);
    }

    pub fn speed(&self) -> f64 {
        self.inner.timing.borrow().speed
    }

    /// Set the playback rate; negative rates are clamped to zero
    pub fn set_speed(&self, speed: f64) {
        let speed = if speed < 0.0 || !speed.is_finite() {
            tracing::warn!(speed, "ValueAnimation: invalid speed, clamping to 0");
            0.0
        } else {
            speed
        };
        self.inner.timing.borrow_mut().speed = speed;
    }

    /// Generator duration (ms)
    pub fn duration(&self) -> f64 {
        self.inner.generator.resolved_duration()
    }

    /// Handle for the current play
    pub fn finished(&self) -> CompletionHandle {
        self.inner.completion.borrow().clone()
    }

    pub fn target(&self) -> Option<MotionValue<T>> {
        self.inner.target.upgrade()
    }
}

impl<T: MotionType> MotionController for ValueAnimation<T> {
    fn update(&self, frame: &FrameData) {
        self.inner.update(frame.delta);
    }

    fn is_finished(&self) -> bool {
        let timing = self.inner.timing.borrow();
        timing.state == PlayState::Finished || timing.halted || self.inner.target.upgrade().is_none()
    }
}

impl<T: MotionType> std::fmt::Debug for ValueAnimation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let timing = self.inner.timing.borrow();
        f.debug_struct("ValueAnimation")
            .field("id", &self.inner.id)
            .field("state", &timing.state)
            .field("time", &timing.time)
            .field("speed", &timing.speed)
            .finish()
    }
}
