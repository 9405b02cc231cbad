//! Derived motion values
//!
//! A [`DerivedValue`] owns a [`MotionValue`] whose contents are recomputed
//! from a transform whenever one of its inputs changes. Inputs are fixed at
//! construction, before the output exists, so derived values cannot form
//! cycles.

use crate::clock::SyncClock;
use crate::error::{MotionError, Result};
use crate::motion_value::MotionValue;
use crate::numeric::MotionType;
use crate::subscription::Subscription;
use std::cell::RefCell;
use std::rc::Rc;

/// Anything a derived value can listen to
pub trait ChangeSource {
    /// Call `listener` after every change
    fn subscribe_change(&self, listener: Rc<dyn Fn()>) -> Subscription;

    fn clock(&self) -> &SyncClock;

    fn is_destroyed(&self) -> bool;
}

impl<T: MotionType> ChangeSource for MotionValue<T> {
    fn subscribe_change(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.on_change(move |_| listener())
    }

    fn clock(&self) -> &SyncClock {
        MotionValue::clock(self)
    }

    fn is_destroyed(&self) -> bool {
        MotionValue::is_destroyed(self)
    }
}

/// A motion value computed from other values
///
/// Dropping (or destroying) the derived value releases its input
/// subscriptions. Clones of [`DerivedValue::value`] outlive it but stop
/// updating.
pub struct DerivedValue<T: MotionType> {
    value: MotionValue<T>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl<T: MotionType> DerivedValue<T> {
    /// Create a derived value from `inputs`
    ///
    /// The transform runs once immediately for the initial value, then once
    /// per input change.
    pub fn new<F>(inputs: &[&dyn ChangeSource], transform: F) -> Result<Self>
    where
        F: Fn() -> T + 'static,
    {
        let Some(first) = inputs.first() else {
            return Err(MotionError::InvalidArgument(
                "derived value needs at least one input".into(),
            ));
        };
        if inputs.iter().any(|input| input.is_destroyed()) {
            return Err(MotionError::InvalidArgument(
                "derived value input has been destroyed".into(),
            ));
        }

        let value = MotionValue::new(first.clock(), transform());

        let output = value.downgrade();
        let recompute: Rc<dyn Fn()> = Rc::new(move || {
            if let Some(output) = output.upgrade() {
                output.set(transform());
            }
        });

        let subscriptions = inputs
            .iter()
            .map(|input| input.subscribe_change(recompute.clone()))
            .collect();

        Ok(Self {
            value,
            subscriptions: RefCell::new(subscriptions),
        })
    }

    pub fn get(&self) -> T {
        self.value.get()
    }

    /// The underlying motion value
    pub fn value(&self) -> &MotionValue<T> {
        &self.value
    }

    /// Release the inputs and destroy the output value
    pub fn destroy(&self) {
        self.subscriptions.borrow_mut().clear();
        self.value.destroy();
    }
}

impl<T: MotionType> std::ops::Deref for DerivedValue<T> {
    type Target = MotionValue<T>;

    fn deref(&self) -> &MotionValue<T> {
        &self.value
    }
}

impl<T: MotionType> MotionValue<T> {
    /// Derive a value by applying `f` to this one
    pub fn map<U, F>(&self, f: F) -> Result<DerivedValue<U>>
    where
        U: MotionType,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.downgrade();
        let initial = self.get();
        let fallback = f(&initial);
        let last = RefCell::new(fallback);
        DerivedValue::new(&[self as &dyn ChangeSource], move || {
            if let Some(source) = source.upgrade() {
                *last.borrow_mut() = f(&source.get());
            }
            last.borrow().clone()
        })
    }
}
