//! Tick system
//!
//! The tick system is the entry point the host calls once per external tick.
//! It owns the pluggable [`TickDriver`], a [`MotionSystem`] of registered
//! controllers, and the "after tick" notification used to drive everything
//! else (see [`crate::frame_loop::FrameLoop`]).
//!
//! There is no global instance: the host creates one `TickSystem`, keeps it
//! for the lifetime of the process, and passes clones of its handles to the
//! code that needs them.

use crate::clock::SyncClock;
use crate::frame::{FrameData, DEFAULT_FRAME_DELTA_MS};
use crate::subscription::{SubscriberList, Subscription};
use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ============================================================================
// Tick Driver
// ============================================================================

/// Supplies frame timing to the tick system
pub trait TickDriver {
    /// Timing of the frame being ticked
    fn frame_data(&self) -> FrameData;

    /// Whether ticks should run at all
    fn is_active(&self) -> bool;
}

/// A driver whose time only moves when the host advances it
///
/// Useful for headless hosts, offline rendering and tests.
#[derive(Debug)]
pub struct ManualDriver {
    frame: Cell<FrameData>,
    active: Cell<bool>,
}

impl ManualDriver {
    pub fn new() -> Self {
        Self {
            frame: Cell::new(FrameData::default()),
            active: Cell::new(true),
        }
    }

    /// Move time forward by `delta_ms`
    pub fn advance(&self, delta_ms: f64) {
        let frame = self.frame.get();
        self.frame.set(FrameData {
            delta: delta_ms,
            now: frame.now + delta_ms,
            is_processing: false,
        });
    }

    /// Advance by one default-length frame
    pub fn advance_frame(&self) {
        self.advance(DEFAULT_FRAME_DELTA_MS);
    }

    pub fn set_active(&self, active: bool) {
        self.active.set(active);
    }
}

impl Default for ManualDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TickDriver for ManualDriver {
    fn frame_data(&self) -> FrameData {
        self.frame.get()
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

// ============================================================================
// Motion System
// ============================================================================

new_key_type! {
    /// Handle to a controller registered with a motion system
    pub struct ControllerId;
}

/// Something the motion system updates once per tick
pub trait MotionController {
    fn update(&self, frame: &FrameData);

    /// Finished controllers are dropped from the registry after the tick
    fn is_finished(&self) -> bool {
        false
    }
}

struct MotionSystemInner {
    controllers: RefCell<SlotMap<ControllerId, Rc<dyn MotionController>>>,
    /// Iteration order
    order: RefCell<Vec<ControllerId>>,
    /// Controllers added while iterating, appended when iteration ends
    pending_add: RefCell<Vec<ControllerId>>,
    iterating: Cell<bool>,
}

/// Registry of controllers ticked by index
///
/// Controllers may add or remove controllers (including themselves) while
/// being updated. Additions take effect on the next tick; removals take
/// effect immediately, so a removed controller is never updated again.
#[derive(Clone)]
pub struct MotionSystem {
    inner: Rc<MotionSystemInner>,
}

impl MotionSystem {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MotionSystemInner {
                controllers: RefCell::new(SlotMap::with_key()),
                order: RefCell::new(Vec::new()),
                pending_add: RefCell::new(Vec::new()),
                iterating: Cell::new(false),
            }),
        }
    }

    /// Register a controller
    pub fn add(&self, controller: Rc<dyn MotionController>) -> ControllerId {
        let id = self.inner.controllers.borrow_mut().insert(controller);
        if self.inner.iterating.get() {
            self.inner.pending_add.borrow_mut().push(id);
        } else {
            self.inner.order.borrow_mut().push(id);
        }
        id
    }

    /// Unregister a controller, returning it if it was registered
    pub fn remove(&self, id: ControllerId) -> Option<Rc<dyn MotionController>> {
        let removed = self.inner.controllers.borrow_mut().remove(id);
        if removed.is_some() && !self.inner.iterating.get() {
            self.inner.order.borrow_mut().retain(|other| *other != id);
        }
        removed
    }

    pub fn contains(&self, id: ControllerId) -> bool {
        self.inner.controllers.borrow().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.controllers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.controllers.borrow().is_empty()
    }

    /// Drop every controller
    pub fn clear(&self) {
        self.inner.controllers.borrow_mut().clear();
        self.inner.pending_add.borrow_mut().clear();
        if !self.inner.iterating.get() {
            self.inner.order.borrow_mut().clear();
        }
    }

    /// Update every registered controller once
    pub fn tick(&self, frame: &FrameData) {
        if self.inner.iterating.get() {
            tracing::warn!("MotionSystem: tick() called while already ticking, ignoring");
            return;
        }

        self.begin_iteration();

        let mut index = 0;
        loop {
            let id = match self.inner.order.borrow().get(index) {
                Some(id) => *id,
                None => break,
            };
            index += 1;

            let controller = self.inner.controllers.borrow().get(id).cloned();
            if let Some(controller) = controller {
                controller.update(frame);
            }
        }

        self.end_iteration();
        self.prune_finished();
    }

    fn begin_iteration(&self) {
        self.inner.iterating.set(true);
    }

    fn end_iteration(&self) {
        self.inner.iterating.set(false);

        let controllers = self.inner.controllers.borrow();
        let mut order = self.inner.order.borrow_mut();
        order.retain(|id| controllers.contains_key(*id));
        order.extend(
            self.inner
                .pending_add
                .borrow_mut()
                .drain(..)
                .filter(|id| controllers.contains_key(*id)),
        );
    }

    fn prune_finished(&self) {
        let finished: Vec<ControllerId> = self
            .inner
            .controllers
            .borrow()
            .iter()
            .filter(|(_, controller)| controller.is_finished())
            .map(|(id, _)| id)
            .collect();

        for id in finished {
            self.remove(id);
        }
    }
}

impl Default for MotionSystem {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tick System
// ============================================================================

/// Per-process tick context
///
/// ```
/// use cadence_core::tick::{ManualDriver, TickSystem};
/// use std::rc::Rc;
///
/// let ticks = TickSystem::new();
/// let driver = Rc::new(ManualDriver::new());
/// ticks.initialize(driver.clone());
///
/// driver.advance(16.0);
/// assert!(ticks.tick());
/// ```
pub struct TickSystem {
    driver: RefCell<Option<Rc<dyn TickDriver>>>,
    motion: MotionSystem,
    clock: SyncClock,
    after_tick: SubscriberList<()>,
    latest: Cell<Option<FrameData>>,
}

impl TickSystem {
    pub fn new() -> Self {
        Self::with_clock(SyncClock::new())
    }

    /// Create a tick system sharing an existing clock
    pub fn with_clock(clock: SyncClock) -> Self {
        Self {
            driver: RefCell::new(None),
            motion: MotionSystem::new(),
            clock,
            after_tick: SubscriberList::new(),
            latest: Cell::new(None),
        }
    }

    /// Install a driver
    ///
    /// Installing the driver that is already installed does nothing;
    /// installing a different one shuts the current one down first.
    pub fn initialize(&self, driver: Rc<dyn TickDriver>) {
        let same = self
            .driver
            .borrow()
            .as_ref()
            .is_some_and(|current| {
                Rc::as_ptr(current) as *const () == Rc::as_ptr(&driver) as *const ()
            });
        if same {
            return;
        }

        if self.is_initialized() {
            self.shutdown();
        }

        tracing::debug!("TickSystem: initialized");
        *self.driver.borrow_mut() = Some(driver);
    }

    /// Remove the driver and drop every registered controller
    pub fn shutdown(&self) {
        if self.driver.borrow_mut().take().is_some() {
            tracing::debug!("TickSystem: shut down");
        }
        self.motion.clear();
        self.clock.clear();
        self.latest.set(None);
    }

    pub fn is_initialized(&self) -> bool {
        self.driver.borrow().is_some()
    }

    /// Run one tick
    ///
    /// Returns `false` without doing anything when no driver is installed or
    /// the driver is inactive.
    pub fn tick(&self) -> bool {
        let driver = match self.driver.borrow().as_ref() {
            Some(driver) if driver.is_active() => driver.clone(),
            _ => return false,
        };

        let frame = FrameData {
            is_processing: true,
            ..driver.frame_data()
        };
        self.latest.set(Some(frame));
        self.clock.sync(frame);

        self.motion.tick(&frame);
        self.after_tick.notify(&());

        self.clock.clear();
        true
    }

    /// Listen for completed ticks
    pub fn on_after_tick<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + 'static,
    {
        self.after_tick.subscribe(move |_| listener())
    }

    /// Frame data of the most recent tick
    pub fn latest_frame(&self) -> Option<FrameData> {
        self.latest.get()
    }

    pub fn motion_system(&self) -> &MotionSystem {
        &self.motion
    }

    pub fn clock(&self) -> &SyncClock {
        &self.clock
    }
}

impl Default for TickSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        count: Cell<u32>,
        finish_after: Option<u32>,
    }

    impl Counter {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                count: Cell::new(0),
                finish_after: None,
            })
        }
    }

    impl MotionController for Counter {
        fn update(&self, _frame: &FrameData) {
            self.count.set(self.count.get() + 1);
        }

        fn is_finished(&self) -> bool {
            self.finish_after.is_some_and(|n| self.count.get() >= n)
        }
    }

    #[test]
    fn test_tick_requires_active_driver() {
        let ticks = TickSystem::new();
        assert!(!ticks.tick());

        let driver = Rc::new(ManualDriver::new());
        ticks.initialize(driver.clone());
        assert!(ticks.tick());

        driver.set_active(false);
        assert!(!ticks.tick());
    }

    #[test]
    fn test_initialize_idempotent() {
        let ticks = TickSystem::new();
        let driver: Rc<dyn TickDriver> = Rc::new(ManualDriver::new());
        let counter = Counter::new();

        ticks.initialize(driver.clone());
        ticks.motion_system().add(counter.clone());

        // Same driver: controllers survive
        ticks.initialize(driver.clone());
        assert_eq!(ticks.motion_system().len(), 1);

        // Different driver: shut down first
        ticks.initialize(Rc::new(ManualDriver::new()));
        assert!(ticks.is_initialized());
        assert!(ticks.motion_system().is_empty());
    }

    #[test]
    fn test_after_tick_and_latest_frame() {
        let ticks = TickSystem::new();
        let driver = Rc::new(ManualDriver::new());
        ticks.initialize(driver.clone());

        let fired = Rc::new(Cell::new(0));
        let fired_clone = fired.clone();
        let _sub = ticks.on_after_tick(move || fired_clone.set(fired_clone.get() + 1));

        driver.advance(20.0);
        ticks.tick();
        assert_eq!(fired.get(), 1);

        let frame = ticks.latest_frame().unwrap();
        assert_eq!(frame.now, 20.0);
        assert_eq!(frame.delta, 20.0);
        assert!(!ticks.clock().is_synced());
    }

    #[test]
    fn test_clock_synced_during_motion_tick() {
        let ticks = TickSystem::new();
        let driver = Rc::new(ManualDriver::new());
        ticks.initialize(driver.clone());

        struct ReadClock {
            clock: SyncClock,
            seen: Cell<f64>,
        }
        impl MotionController for ReadClock {
            fn update(&self, _frame: &FrameData) {
                self.seen.set(self.clock.now());
            }
        }

        let reader = Rc::new(ReadClock {
            clock: ticks.clock().clone(),
            seen: Cell::new(-1.0),
        });
        ticks.motion_system().add(reader.clone());

        driver.advance(50.0);
        ticks.tick();
        assert_eq!(reader.seen.get(), 50.0);
    }

    #[test]
    fn test_mutation_during_iteration() {
        let system = MotionSystem::new();
        let late = Counter::new();
        let victim = Counter::new();
        let victim_id = system.add(victim.clone());

        struct Mutator {
            system: MotionSystem,
            late: Rc<Counter>,
            victim: ControllerId,
            done: Cell<bool>,
        }
        impl MotionController for Mutator {
            fn update(&self, _frame: &FrameData) {
                if !self.done.replace(true) {
                    self.system.add(self.late.clone());
                    self.system.remove(self.victim);
                }
            }
        }

        // Mutator runs after the victim in the first tick
        system.add(Rc::new(Mutator {
            system: system.clone(),
            late: late.clone(),
            victim: victim_id,
            done: Cell::new(false),
        }));

        let frame = FrameData::new(16.0, 16.0);
        system.tick(&frame);
        assert_eq!(victim.count.get(), 1);
        assert_eq!(late.count.get(), 0);

        system.tick(&frame);
        assert_eq!(victim.count.get(), 1);
        assert_eq!(late.count.get(), 1);
        assert!(!system.contains(victim_id));
    }

    #[test]
    fn test_finished_controllers_pruned() {
        let system = MotionSystem::new();
        let counter = Rc::new(Counter {
            count: Cell::new(0),
            finish_after: Some(2),
        });
        let id = system.add(counter.clone());

        let frame = FrameData::new(16.0, 16.0);
        system.tick(&frame);
        assert!(system.contains(id));
        system.tick(&frame);
        assert!(!system.contains(id));
        system.tick(&frame);
        assert_eq!(counter.count.get(), 2);
    }
}
