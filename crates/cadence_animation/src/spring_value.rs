//! Spring-backed motion values
//!
//! A [`SpringValue`] intercepts writes with a passive effect: instead of
//! jumping to the written value it starts a spring from the current value
//! and velocity towards it. Interrupting a spring mid-flight carries the
//! velocity over into the next one.

use crate::animation::ValueAnimation;
use crate::spring::{SpringGenerator, SpringOptions};
use cadence_core::{
    Committer, MotionSystem, MotionValue, Result, Subscription, TickSystem, WeakMotionValue,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct SpringState {
    options: Cell<SpringOptions>,
    system: MotionSystem,
    active: RefCell<Option<ValueAnimation<f64>>>,
    follow: RefCell<Option<Subscription>>,
}

impl SpringState {
    fn animate_to(&self, value: &MotionValue<f64>, target: f64, commit: &Committer<f64>) {
        let origin = value.get();
        let options = self.options.get().with_velocity(value.get_velocity());

        let animation = SpringGenerator::new(origin, target, options)
            .and_then(|spring| ValueAnimation::new(value, spring));
        match animation {
            Ok(animation) => {
                let animation = animation.bypass_effect();
                animation.play_on(&self.system);
                *self.active.borrow_mut() = Some(animation);
            }
            Err(err) => {
                tracing::warn!(%err, target, "SpringValue: cannot animate, jumping to target");
                commit.commit(target);
            }
        }
    }

    fn stop_spring(&self) {
        let active = self.active.borrow_mut().take();
        if let Some(animation) = active {
            animation.stop();
        }
    }
}

/// A `MotionValue<f64>` that springs towards every value written to it
pub struct SpringValue {
    value: MotionValue<f64>,
    state: Rc<SpringState>,
}

impl SpringValue {
    /// Create a spring value driven by `ticks`
    pub fn new(ticks: &TickSystem, initial: f64, options: SpringOptions) -> Result<Self> {
        // Reject bad options up front rather than on the first write
        SpringGenerator::new(initial, initial, options)?;

        let value = MotionValue::new(ticks.clock(), initial);
        let state = Rc::new(SpringState {
            options: Cell::new(options),
            system: ticks.motion_system().clone(),
            active: RefCell::new(None),
            follow: RefCell::new(None),
        });

        let weak_value: WeakMotionValue<f64> = value.downgrade();
        let weak_state: Weak<SpringState> = Rc::downgrade(&state);
        let stop_state = weak_state.clone();
        value.attach(
            move |target: f64, commit: &Committer<f64>| {
                if let (Some(value), Some(state)) = (weak_value.upgrade(), weak_state.upgrade()) {
                    state.animate_to(&value, target, commit);
                }
            },
            move || {
                if let Some(state) = stop_state.upgrade() {
                    state.stop_spring();
                }
            },
        );

        Ok(Self { value, state })
    }

    pub fn get(&self) -> f64 {
        self.value.get()
    }

    pub fn get_velocity(&self) -> f64 {
        self.value.get_velocity()
    }

    /// Spring towards `target`
    pub fn set(&self, target: f64) {
        self.value.set(target);
    }

    /// Move to `value` immediately, ending any spring in flight
    pub fn jump(&self, value: f64) {
        self.state.stop_spring();
        self.value.jump(value, false);
    }

    /// Spring towards every value `source` takes
    pub fn follow(&self, source: &MotionValue<f64>) {
        let target = self.value.downgrade();
        let subscription = source.on_change(move |v| {
            if let Some(target) = target.upgrade() {
                target.set(*v);
            }
        });
        *self.state.follow.borrow_mut() = Some(subscription);
    }

    /// Stop following the current source
    pub fn unfollow(&self) {
        self.state.follow.borrow_mut().take();
    }

    pub fn is_animating(&self) -> bool {
        self.value.is_animating()
    }

    pub fn options(&self) -> SpringOptions {
        self.state.options.get()
    }

    /// Options used by the next spring
    pub fn set_options(&self, options: SpringOptions) -> Result<()> {
        let current = self.value.get();
        SpringGenerator::new(current, current, options)?;
        self.state.options.set(options);
        Ok(())
    }

    /// The underlying motion value
    pub fn value(&self) -> &MotionValue<f64> {
        &self.value
    }

    /// Stop the spring and tear the value down
    pub fn destroy(&self) {
        self.unfollow();
        self.value.destroy();
    }
}
