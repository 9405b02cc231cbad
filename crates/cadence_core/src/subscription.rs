//! Subscriber lists and subscription handles
//!
//! Listeners are stored in a slot map so removal is O(1) and keys stay valid
//! while other listeners come and go. Notification snapshots the current
//! listeners before calling any of them, so a listener may subscribe or
//! unsubscribe (itself or others) while being notified.

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

new_key_type! {
    /// Key of a listener inside a subscriber list
    pub struct SubscriberKey;
}

type Listener<A> = Rc<dyn Fn(&A)>;
type ListenerMap<A> = RefCell<SlotMap<SubscriberKey, Listener<A>>>;

/// A list of listeners receiving `&A`
pub struct SubscriberList<A: 'static> {
    listeners: Rc<ListenerMap<A>>,
}

impl<A: 'static> SubscriberList<A> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(RefCell::new(SlotMap::with_key())),
        }
    }

    /// Add a listener, returning the handle that releases it
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&A) + 'static,
    {
        let key = self.listeners.borrow_mut().insert(Rc::new(listener));
        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners.borrow_mut().remove(key);
            }
        })
    }

    /// Call every listener with `arg`
    pub fn notify(&self, arg: &A) {
        let snapshot: SmallVec<[Listener<A>; 4]> =
            self.listeners.borrow().values().cloned().collect();
        for listener in snapshot {
            listener(arg);
        }
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

impl<A: 'static> Default for SubscriberList<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a registered listener
///
/// Its only capability is releasing the listener, either explicitly through
/// [`Subscription::unsubscribe`] or implicitly when dropped.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `release` when unsubscribed
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Release the listener now
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
