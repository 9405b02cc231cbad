//! Motion values
//!
//! A [`MotionValue`] is an observable container for one animated quantity.
//! Besides the current value it remembers the value it replaced and a sample
//! from the previous frame, which is what makes [`MotionValue::get_velocity`]
//! meaningful frame-over-frame rather than between two writes of one frame.
//!
//! # Example
//!
//! ```
//! use cadence_core::clock::SyncClock;
//! use cadence_core::motion_value::MotionValue;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let clock = SyncClock::new();
//! let opacity = MotionValue::new(&clock, 0.0_f64);
//!
//! let seen = Rc::new(Cell::new(0.0));
//! let seen_clone = seen.clone();
//! let _sub = opacity.on_change(move |v| seen_clone.set(*v));
//!
//! opacity.set(0.5);
//! assert_eq!(seen.get(), 0.5);
//! ```

use crate::clock::SyncClock;
use crate::error::{MotionError, Result};
use crate::numeric::MotionType;
use crate::subscription::{SubscriberList, Subscription};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Samples older than this no longer contribute to velocity (ms)
pub const MAX_VELOCITY_DELTA_MS: f64 = 30.0;

/// Convert a change over `frame_duration` milliseconds into a per-second rate
pub fn velocity_per_second(change: f64, frame_duration: f64) -> f64 {
    if frame_duration != 0.0 {
        change * (1000.0 / frame_duration)
    } else {
        0.0
    }
}

static NEXT_VALUE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a motion value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ValueId(u64);

impl ValueId {
    fn next() -> Self {
        ValueId(NEXT_VALUE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Strategy that intercepts writes to a motion value
///
/// While attached, every [`MotionValue::set`] is handed to the effect
/// instead of being committed. The effect commits (now, later, or never)
/// through the [`Committer`].
pub trait PassiveEffect<T: MotionType> {
    fn intercept(&self, value: T, commit: &Committer<T>);
}

impl<T, F> PassiveEffect<T> for F
where
    T: MotionType,
    F: Fn(T, &Committer<T>),
{
    fn intercept(&self, value: T, commit: &Committer<T>) {
        self(value, commit)
    }
}

/// An animation currently driving a motion value
pub trait ActiveAnimation {
    /// Identity used to match completion reports
    fn animation_id(&self) -> u64;

    /// Halt the animation without completing it
    fn stop(&self);
}

/// How an animation stopped driving its value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationOutcome {
    Completed,
    Cancelled,
}

/// Something notified when a value it depends on changes
trait Dependent {
    fn value_id(&self) -> ValueId;

    fn dirty(&self);

    /// Whether `target` is this node or reachable through its dependents
    fn reaches(&self, target: ValueId, visited: &mut FxHashSet<ValueId>) -> bool;
}

// ============================================================================
// Internal state
// ============================================================================

struct ValueState<T> {
    current: T,
    previous: Option<T>,
    prev_frame_value: Option<T>,
    updated_at: f64,
    prev_updated_at: Option<f64>,
    can_track_velocity: bool,
}

struct EffectSlot<T: MotionType> {
    effect: Rc<dyn PassiveEffect<T>>,
    stop: Option<Box<dyn FnOnce()>>,
}

struct ValueEvents<T: 'static> {
    change: SubscriberList<T>,
    animation_start: SubscriberList<()>,
    animation_complete: SubscriberList<()>,
    animation_cancel: SubscriberList<()>,
    destroy: SubscriberList<()>,
}

impl<T: 'static> ValueEvents<T> {
    fn new() -> Self {
        Self {
            change: SubscriberList::new(),
            animation_start: SubscriberList::new(),
            animation_complete: SubscriberList::new(),
            animation_cancel: SubscriberList::new(),
            destroy: SubscriberList::new(),
        }
    }

    fn clear(&self) {
        self.change.clear();
        self.animation_start.clear();
        self.animation_complete.clear();
        self.animation_cancel.clear();
        self.destroy.clear();
    }
}

struct ValueInner<T: MotionType> {
    id: ValueId,
    clock: SyncClock,
    state: RefCell<ValueState<T>>,
    effect: RefCell<Option<EffectSlot<T>>>,
    animation: RefCell<Option<Rc<dyn ActiveAnimation>>>,
    dependents: RefCell<SmallVec<[Weak<dyn Dependent>; 2]>>,
    events: ValueEvents<T>,
    destroyed: Cell<bool>,
}

impl<T: MotionType> ValueInner<T> {
    /// Commit a value, bypassing any passive effect
    fn update_and_notify(&self, value: T) {
        let now = self.clock.now();

        let changed = {
            let mut state = self.state.borrow_mut();

            // First write of a new frame: keep the last committed sample
            if state.updated_at != now {
                state.prev_frame_value = Some(state.current.clone());
                state.prev_updated_at = Some(state.updated_at);
            }

            let replaced = std::mem::replace(&mut state.current, value);
            let changed = replaced != state.current;
            if changed {
                state.updated_at = now;
            }
            state.previous = Some(replaced);
            changed
        };

        if changed {
            let current = self.state.borrow().current.clone();
            self.events.change.notify(&current);
            self.notify_dependents();
        }
    }

    fn notify_dependents(&self) {
        let live: SmallVec<[Rc<dyn Dependent>; 2]> = {
            let mut dependents = self.dependents.borrow_mut();
            dependents.retain(|d| d.strong_count() > 0);
            dependents.iter().filter_map(Weak::upgrade).collect()
        };
        for dependent in live {
            dependent.dirty();
        }
    }
}

impl<T: MotionType> Dependent for ValueInner<T> {
    fn value_id(&self) -> ValueId {
        self.id
    }

    fn dirty(&self) {
        let current = self.state.borrow().current.clone();
        self.events.change.notify(&current);
    }

    fn reaches(&self, target: ValueId, visited: &mut FxHashSet<ValueId>) -> bool {
        if self.id == target {
            return true;
        }
        if !visited.insert(self.id) {
            return false;
        }

        let dependents: SmallVec<[Rc<dyn Dependent>; 2]> = self
            .dependents
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        dependents.iter().any(|d| d.reaches(target, visited))
    }
}

// ============================================================================
// Committer
// ============================================================================

/// Safe setter handed to passive effects
///
/// Commits go straight to the value, skipping the effect that received the
/// committer, so an effect can write without re-triggering itself.
pub struct Committer<T: MotionType> {
    target: Weak<ValueInner<T>>,
}

impl<T: MotionType> Committer<T> {
    /// Commit `value` to the target, if it is still alive
    pub fn commit(&self, value: T) {
        if let Some(inner) = self.target.upgrade() {
            inner.update_and_notify(value);
        }
    }

    /// The target's current value, if it is still alive
    pub fn current(&self) -> Option<T> {
        self.target
            .upgrade()
            .map(|inner| inner.state.borrow().current.clone())
    }
}

impl<T: MotionType> Clone for Committer<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

// ============================================================================
// Motion Value
// ============================================================================

/// A velocity-tracking observable value (cheap to clone, clones share state)
pub struct MotionValue<T: MotionType> {
    inner: Rc<ValueInner<T>>,
}

impl<T: MotionType> Clone for MotionValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: MotionType> MotionValue<T> {
    /// Create a value reading time from `clock`
    pub fn new(clock: &SyncClock, initial: T) -> Self {
        let can_track_velocity = initial.to_scalar().is_some();
        let updated_at = clock.now();

        Self {
            inner: Rc::new(ValueInner {
                id: ValueId::next(),
                clock: clock.clone(),
                state: RefCell::new(ValueState {
                    current: initial,
                    previous: None,
                    prev_frame_value: None,
                    updated_at,
                    prev_updated_at: None,
                    can_track_velocity,
                }),
                effect: RefCell::new(None),
                animation: RefCell::new(None),
                dependents: RefCell::new(SmallVec::new()),
                events: ValueEvents::new(),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn id(&self) -> ValueId {
        self.inner.id
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.state.borrow().current.clone()
    }

    /// The value replaced by the most recent write
    pub fn get_previous(&self) -> Option<T> {
        self.inner.state.borrow().previous.clone()
    }

    /// Time of the last write that changed the value (ms)
    pub fn updated_at(&self) -> f64 {
        self.inner.state.borrow().updated_at
    }

    pub fn clock(&self) -> &SyncClock {
        &self.inner.clock
    }

    /// Write a value
    ///
    /// With a passive effect attached the effect decides what to commit;
    /// otherwise the value is committed immediately. Listeners and
    /// dependents are notified only when the value actually changes.
    pub fn set(&self, value: T) {
        let effect = self
            .inner
            .effect
            .borrow()
            .as_ref()
            .map(|slot| slot.effect.clone());

        match effect {
            Some(effect) => effect.intercept(value, &self.committer()),
            None => self.inner.update_and_notify(value),
        }
    }

    /// Write `current` as if the value had been `prev` `delta` ms earlier
    pub fn set_with_velocity(&self, prev: T, current: T, delta: f64) {
        self.set(current);

        let mut state = self.inner.state.borrow_mut();
        state.previous = None;
        state.prev_updated_at = Some(state.updated_at - delta);
        state.prev_frame_value = Some(prev);
    }

    /// Teleport to `value` without implying motion
    ///
    /// Velocity tracking and the previous value are reset. With
    /// `end_animation` set, any animation driving this value is stopped and
    /// the passive effect is detached.
    pub fn jump(&self, value: T, end_animation: bool) {
        self.inner.update_and_notify(value);

        {
            let mut state = self.inner.state.borrow_mut();
            state.previous = None;
            state.prev_frame_value = None;
            state.prev_updated_at = None;
        }

        if end_animation {
            self.stop();
            self.detach_effect();
        }
    }

    /// Instantaneous velocity in units per second
    ///
    /// Zero for non-scalar types, before a previous-frame sample exists, or
    /// once the last change is older than [`MAX_VELOCITY_DELTA_MS`].
    pub fn get_velocity(&self) -> f64 {
        let now = self.inner.clock.now();
        let state = self.inner.state.borrow();

        if !state.can_track_velocity {
            return 0.0;
        }
        let (Some(prev), Some(prev_updated_at)) =
            (state.prev_frame_value.as_ref(), state.prev_updated_at)
        else {
            return 0.0;
        };
        if now - state.updated_at > MAX_VELOCITY_DELTA_MS {
            return 0.0;
        }

        let delta = (state.updated_at - prev_updated_at).min(MAX_VELOCITY_DELTA_MS);
        match (state.current.to_scalar(), prev.to_scalar()) {
            (Some(current), Some(prev)) => velocity_per_second(current - prev, delta),
            _ => 0.0,
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Listen for changes of the value
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.inner.events.change.subscribe(listener)
    }

    pub fn on_animation_start<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner
            .events
            .animation_start
            .subscribe(move |_| listener())
    }

    pub fn on_animation_complete<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner
            .events
            .animation_complete
            .subscribe(move |_| listener())
    }

    pub fn on_animation_cancel<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner
            .events
            .animation_cancel
            .subscribe(move |_| listener())
    }

    pub fn on_destroy<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.inner.events.destroy.subscribe(move |_| listener())
    }

    /// Number of change listeners
    pub fn change_listener_count(&self) -> usize {
        self.inner.events.change.len()
    }

    // =========================================================================
    // Passive effects
    // =========================================================================

    /// Intercept every future [`MotionValue::set`] with `effect`
    ///
    /// `stop` runs when the effect is detached (by [`MotionValue::jump`],
    /// [`MotionValue::destroy`], [`MotionValue::detach_effect`] or a newer
    /// `attach`).
    pub fn attach<E, S>(&self, effect: E, stop: S)
    where
        E: PassiveEffect<T> + 'static,
        S: FnOnce() + 'static,
    {
        self.detach_effect();
        *self.inner.effect.borrow_mut() = Some(EffectSlot {
            effect: Rc::new(effect),
            stop: Some(Box::new(stop)),
        });
    }

    /// Remove the passive effect, running its stop callback
    pub fn detach_effect(&self) {
        let slot = self.inner.effect.borrow_mut().take();
        if let Some(stop) = slot.and_then(|slot| slot.stop) {
            stop();
        }
    }

    pub fn has_effect(&self) -> bool {
        self.inner.effect.borrow().is_some()
    }

    /// Setter that bypasses the passive effect
    pub fn committer(&self) -> Committer<T> {
        Committer {
            target: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // Dependents
    // =========================================================================

    /// Mark `dependent` dirty whenever this value changes
    ///
    /// A dirty value re-notifies its own change listeners with its current
    /// value. Edges that would close a cycle are rejected.
    pub fn add_dependent<U: MotionType>(&self, dependent: &MotionValue<U>) -> Result<()> {
        if self.is_destroyed() || dependent.is_destroyed() {
            return Err(MotionError::InvalidArgument(
                "cannot link a destroyed motion value".into(),
            ));
        }

        let mut visited = FxHashSet::default();
        if dependent.inner.reaches(self.inner.id, &mut visited) {
            return Err(MotionError::InvalidConfiguration(format!(
                "dependency {:?} -> {:?} would form a cycle",
                self.inner.id, dependent.inner.id
            )));
        }

        let mut dependents = self.inner.dependents.borrow_mut();
        let id = dependent.inner.id;
        let exists = dependents
            .iter()
            .filter_map(Weak::upgrade)
            .any(|d| d.value_id() == id);
        if !exists {
            let weak: Weak<dyn Dependent> = Rc::downgrade(&dependent.inner) as Weak<ValueInner<U>>;
            dependents.push(weak);
        }
        Ok(())
    }

    /// Stop marking `dependent` dirty
    pub fn remove_dependent<U: MotionType>(&self, dependent: &MotionValue<U>) {
        let id = dependent.inner.id;
        self.inner
            .dependents
            .borrow_mut()
            .retain(|d| d.upgrade().is_some_and(|d| d.value_id() != id));
    }

    pub fn dependent_count(&self) -> usize {
        self.inner
            .dependents
            .borrow()
            .iter()
            .filter(|d| d.strong_count() > 0)
            .count()
    }

    // =========================================================================
    // Animation bookkeeping
    // =========================================================================

    /// Record `animation` as the one driving this value
    ///
    /// A different animation already driving the value is stopped first.
    pub fn start_animation(&self, animation: Rc<dyn ActiveAnimation>) {
        let previous = self.inner.animation.borrow_mut().take();
        if let Some(previous) = previous {
            if previous.animation_id() == animation.animation_id() {
                *self.inner.animation.borrow_mut() = Some(previous);
                return;
            }
            previous.stop();
            self.inner.events.animation_cancel.notify(&());
        }

        *self.inner.animation.borrow_mut() = Some(animation);
        self.inner.events.animation_start.notify(&());
    }

    /// Report that animation `id` no longer drives this value
    ///
    /// Ignored unless `id` is the active animation.
    pub fn finish_animation(&self, id: u64, outcome: AnimationOutcome) {
        let is_active = self
            .inner
            .animation
            .borrow()
            .as_ref()
            .is_some_and(|a| a.animation_id() == id);
        if !is_active {
            return;
        }

        self.inner.animation.borrow_mut().take();
        match outcome {
            AnimationOutcome::Completed => self.inner.events.animation_complete.notify(&()),
            AnimationOutcome::Cancelled => self.inner.events.animation_cancel.notify(&()),
        }
    }

    /// Stop the animation driving this value, if any
    pub fn stop(&self) {
        let animation = self.inner.animation.borrow_mut().take();
        if let Some(animation) = animation {
            animation.stop();
            self.inner.events.animation_cancel.notify(&());
        }
    }

    pub fn is_animating(&self) -> bool {
        self.inner.animation.borrow().is_some()
    }

    // =========================================================================
    // Lifetime
    // =========================================================================

    /// Tear the value down
    ///
    /// Dependents and listeners are cleared (after `destroy` listeners run),
    /// the driving animation is stopped and the passive effect detached.
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }

        self.inner.dependents.borrow_mut().clear();
        self.inner.events.destroy.notify(&());
        self.inner.events.clear();
        self.stop();
        self.detach_effect();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Whether two handles refer to the same value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakMotionValue<T> {
        WeakMotionValue {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T: MotionType + std::fmt::Debug> std::fmt::Debug for MotionValue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("MotionValue")
            .field("id", &self.inner.id)
            .field("current", &state.current)
            .field("updated_at", &state.updated_at)
            .finish()
    }
}

/// Non-owning handle to a motion value
pub struct WeakMotionValue<T: MotionType> {
    inner: Weak<ValueInner<T>>,
}

impl<T: MotionType> WeakMotionValue<T> {
    pub fn upgrade(&self) -> Option<MotionValue<T>> {
        self.inner.upgrade().map(|inner| MotionValue { inner })
    }
}

impl<T: MotionType> Clone for WeakMotionValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
