//! Completion handles
//!
//! Every play of a [`crate::ValueAnimation`] owns one handle that settles
//! exactly once: resolved when the animation completes, cancelled when it is
//! stopped or cancelled first.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Settlement state of a completion handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionState {
    Pending,
    Resolved,
    Cancelled,
}

type SettleCallback = Box<dyn FnOnce(CompletionState)>;

struct CompletionInner {
    state: Cell<CompletionState>,
    callbacks: RefCell<Vec<SettleCallback>>,
}

/// Resolvable, cancellable "finished" handle (clones share state)
#[derive(Clone)]
pub struct CompletionHandle {
    inner: Rc<CompletionInner>,
}

impl CompletionHandle {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(CompletionInner {
                state: Cell::new(CompletionState::Pending),
                callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> CompletionState {
        self.inner.state.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == CompletionState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state() == CompletionState::Resolved
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == CompletionState::Cancelled
    }

    /// Run `callback` once the handle settles (immediately if it already has)
    pub fn on_settled<F>(&self, callback: F)
    where
        F: FnOnce(CompletionState) + 'static,
    {
        match self.state() {
            CompletionState::Pending => self.inner.callbacks.borrow_mut().push(Box::new(callback)),
            settled => callback(settled),
        }
    }

    pub(crate) fn resolve(&self) {
        self.settle(CompletionState::Resolved);
    }

    pub(crate) fn cancel(&self) {
        self.settle(CompletionState::Cancelled);
    }

    fn settle(&self, state: CompletionState) {
        if !self.is_pending() {
            return;
        }
        self.inner.state.set(state);

        let callbacks = std::mem::take(&mut *self.inner.callbacks.borrow_mut());
        for callback in callbacks {
            callback(state);
        }
    }
}

impl std::fmt::Debug for CompletionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHandle")
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_once() {
        let handle = CompletionHandle::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = seen.clone();
        handle.on_settled(move |state| seen_clone.borrow_mut().push(state));

        handle.resolve();
        handle.cancel();
        assert!(handle.is_resolved());
        assert_eq!(*seen.borrow(), vec![CompletionState::Resolved]);
    }

    #[test]
    fn test_late_callback_runs_immediately() {
        let handle = CompletionHandle::new();
        handle.cancel();

        let seen = Rc::new(Cell::new(None));
        let seen_clone = seen.clone();
        handle.on_settled(move |state| seen_clone.set(Some(state)));
        assert_eq!(seen.get(), Some(CompletionState::Cancelled));
    }
}
