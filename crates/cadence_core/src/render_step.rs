//! Render step
//!
//! A render step is one phase bucket of the batcher. Callbacks are collected
//! into a double-buffered pair of sets: work scheduled while a pass is
//! running lands in the next pass unless it asks to run immediately.

use crate::frame::FrameData;
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::cell::{Cell, RefCell};
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A schedulable frame callback
///
/// Identity is the identity of the shared closure: clones of the same
/// `FrameProcess` are the same callback, two separately created processes
/// never are, even if they wrap equivalent code.
#[derive(Clone)]
pub struct FrameProcess(Rc<dyn Fn(&FrameData)>);

impl FrameProcess {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FrameData) + 'static,
    {
        Self(Rc::new(f))
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    fn call(&self, frame: &FrameData) {
        (self.0)(frame)
    }
}

impl PartialEq for FrameProcess {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for FrameProcess {}

impl Hash for FrameProcess {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl std::fmt::Debug for FrameProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FrameProcess").field(&self.addr()).finish()
    }
}

type ProcessSet = IndexSet<FrameProcess, FxBuildHasher>;

#[derive(Default)]
struct StepQueues {
    /// While idle: empty buffer kept for reuse.
    /// While processing: immediate additions for the running pass.
    this_frame: ProcessSet,
    next_frame: ProcessSet,
    keep_alive: FxHashSet<FrameProcess>,
}

/// One phase bucket of scheduled callbacks
pub struct RenderStep {
    queues: RefCell<StepQueues>,
    is_processing: Cell<bool>,
    flush_next_frame: Cell<bool>,
    latest_frame: Cell<FrameData>,
    /// Raised when a keep-alive callback needs another frame
    run_next_frame: Rc<Cell<bool>>,
}

impl RenderStep {
    /// Create a step that raises `run_next_frame` for keep-alive work
    pub fn new(run_next_frame: Rc<Cell<bool>>) -> Self {
        Self {
            queues: RefCell::new(StepQueues::default()),
            is_processing: Cell::new(false),
            flush_next_frame: Cell::new(false),
            latest_frame: Cell::new(FrameData::default()),
            run_next_frame,
        }
    }

    /// Schedule a callback
    ///
    /// With `immediate` set while this step is processing, the callback runs
    /// later in the current pass; otherwise it runs on the next pass. With
    /// `keep_alive` set, it is re-enrolled every frame until cancelled.
    pub fn schedule(&self, process: FrameProcess, keep_alive: bool, immediate: bool) -> FrameProcess {
        let mut queues = self.queues.borrow_mut();
        if keep_alive {
            queues.keep_alive.insert(process.clone());
        }

        if immediate && self.is_processing.get() {
            queues.this_frame.insert(process.clone());
        } else {
            queues.next_frame.insert(process.clone());
        }

        process
    }

    /// Remove a callback from the next pass and from keep-alive
    ///
    /// The pass currently running (if any) is not affected.
    pub fn cancel(&self, process: &FrameProcess) {
        let mut queues = self.queues.borrow_mut();
        queues.next_frame.shift_remove(process);
        queues.keep_alive.remove(process);
    }

    /// Run every callback scheduled for this frame exactly once
    ///
    /// Calling this from inside a running pass does not recurse: the request
    /// is recorded and a single extra pass runs once the current one ends.
    pub fn process(&self, frame: &FrameData) {
        self.latest_frame.set(*frame);

        if self.is_processing.get() {
            self.flush_next_frame.set(true);
            return;
        }

        self.is_processing.set(true);

        let mut current = {
            let mut queues = self.queues.borrow_mut();
            let queues = &mut *queues;
            std::mem::swap(&mut queues.this_frame, &mut queues.next_frame);
            queues.next_frame.clear();
            std::mem::take(&mut queues.this_frame)
        };

        let mut index = 0;
        while let Some(process) = current.get_index(index).cloned() {
            index += 1;
            self.trigger(&process, frame);

            // Pull in anything scheduled as immediate by the callback
            let mut queues = self.queues.borrow_mut();
            if !queues.this_frame.is_empty() {
                current.extend(queues.this_frame.drain(..));
            }
        }

        current.clear();
        {
            let mut queues = self.queues.borrow_mut();
            let pending = std::mem::replace(&mut queues.this_frame, current);
            // Immediate work that arrived after the last callback ran
            if !pending.is_empty() {
                queues.next_frame.extend(pending);
            }
        }

        self.is_processing.set(false);

        if self.flush_next_frame.replace(false) {
            tracing::trace!("RenderStep: flushing re-entrant process request");
            let latest = self.latest_frame.get();
            self.process(&latest);
        }
    }

    fn trigger(&self, process: &FrameProcess, frame: &FrameData) {
        let keep_alive = self.queues.borrow().keep_alive.contains(process);
        if keep_alive {
            self.queues.borrow_mut().next_frame.insert(process.clone());
            self.run_next_frame.set(true);
        }
        process.call(frame);
    }

    /// Whether a pass is currently running
    pub fn is_processing(&self) -> bool {
        self.is_processing.get()
    }

    /// Number of callbacks queued for the next pass
    pub fn pending_count(&self) -> usize {
        self.queues.borrow().next_frame.len()
    }

    /// Whether `process` is enrolled as keep-alive
    pub fn is_kept_alive(&self, process: &FrameProcess) -> bool {
        self.queues.borrow().keep_alive.contains(process)
    }
}

impl Default for RenderStep {
    fn default() -> Self {
        Self::new(Rc::new(Cell::new(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> u32) {
        let count = Rc::new(Cell::new(0));
        let read = count.clone();
        (count, move || read.get())
    }

    fn frame() -> FrameData {
        FrameData::new(16.0, 16.0)
    }

    #[test]
    fn test_runs_each_callback_once() {
        let step = RenderStep::default();
        let (a, a_count) = counter();
        let (b, b_count) = counter();

        step.schedule(FrameProcess::new(move |_| a.set(a.get() + 1)), false, false);
        step.schedule(FrameProcess::new(move |_| b.set(b.get() + 1)), false, false);

        step.process(&frame());
        assert_eq!(a_count(), 1);
        assert_eq!(b_count(), 1);

        // Nothing rescheduled
        step.process(&frame());
        assert_eq!(a_count(), 1);
        assert_eq!(b_count(), 1);
    }

    #[test]
    fn test_scheduling_same_process_twice_runs_once() {
        let step = RenderStep::default();
        let (count, read) = counter();
        let process = FrameProcess::new(move |_| count.set(count.get() + 1));

        step.schedule(process.clone(), false, false);
        step.schedule(process, false, false);
        assert_eq!(step.pending_count(), 1);

        step.process(&frame());
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_reentrant_process_flushes_once() {
        let step = Rc::new(RenderStep::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        let late_log = log.clone();
        let late = FrameProcess::new(move |_| late_log.borrow_mut().push("late"));

        let a_log = log.clone();
        let a_step = Rc::downgrade(&step);
        let a = FrameProcess::new(move |f| {
            a_log.borrow_mut().push("a");
            if let Some(step) = a_step.upgrade() {
                step.schedule(late.clone(), false, false);
                // Re-entrant calls are deferred, however many there are
                step.process(f);
                step.process(f);
            }
        });

        let b_log = log.clone();
        let b = FrameProcess::new(move |_| b_log.borrow_mut().push("b"));

        step.schedule(a, false, false);
        step.schedule(b, false, false);
        step.process(&frame());

        assert_eq!(*log.borrow(), vec!["a", "b", "late"]);
        assert!(!step.is_processing());
    }

    #[test]
    fn test_immediate_runs_in_current_pass() {
        let step = Rc::new(RenderStep::default());
        let (count, read) = counter();

        let inner = FrameProcess::new(move |_| count.set(count.get() + 1));
        let outer_step = Rc::downgrade(&step);
        let outer = FrameProcess::new(move |_| {
            if let Some(step) = outer_step.upgrade() {
                step.schedule(inner.clone(), false, true);
            }
        });

        step.schedule(outer, false, false);
        step.process(&frame());
        assert_eq!(read(), 1);
        assert_eq!(step.pending_count(), 0);
    }

    #[test]
    fn test_immediate_outside_processing_waits() {
        let step = RenderStep::default();
        let (count, read) = counter();

        step.schedule(FrameProcess::new(move |_| count.set(count.get() + 1)), false, true);
        assert_eq!(read(), 0);
        step.process(&frame());
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_keep_alive_until_cancel() {
        let flag = Rc::new(Cell::new(false));
        let step = RenderStep::new(flag.clone());
        let (count, read) = counter();
        let process = FrameProcess::new(move |_| count.set(count.get() + 1));

        step.schedule(process.clone(), true, false);
        for expected in 1..=3 {
            step.process(&frame());
            assert_eq!(read(), expected);
            assert!(flag.replace(false));
        }

        step.cancel(&process);
        assert!(!step.is_kept_alive(&process));
        step.process(&frame());
        step.process(&frame());
        assert_eq!(read(), 3);
        assert!(!flag.get());
    }

    #[test]
    fn test_cancel_does_not_affect_running_pass() {
        let step = Rc::new(RenderStep::default());
        let (count, read) = counter();
        let victim = FrameProcess::new(move |_| count.set(count.get() + 1));

        let cancel_step = Rc::downgrade(&step);
        let victim_clone = victim.clone();
        let canceller = FrameProcess::new(move |_| {
            if let Some(step) = cancel_step.upgrade() {
                step.cancel(&victim_clone);
            }
        });

        step.schedule(canceller, false, false);
        step.schedule(victim, false, false);
        step.process(&frame());
        assert_eq!(read(), 1);
    }
}
