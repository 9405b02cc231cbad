//! Frame loop
//!
//! Connects a [`TickSystem`] to a [`RenderBatcher`]: the batcher's
//! schedule-next-batch requests are parked here and run from the tick
//! system's after-tick notification, so every batch runs on a real tick
//! with the tick's synchronized time.

use crate::batcher::{BatchContinuation, BatcherConfig, RenderBatcher};
use crate::subscription::Subscription;
use crate::tick::TickSystem;
use std::cell::RefCell;
use std::rc::Rc;

type PendingBatch = Rc<RefCell<Option<BatchContinuation>>>;

/// A render batcher driven by a tick system
pub struct FrameLoop {
    batcher: RenderBatcher,
    pending: PendingBatch,
    _after_tick: Subscription,
}

impl FrameLoop {
    /// Create a batcher and run its batches from `ticks`' after-tick event
    pub fn attach(ticks: &TickSystem, config: BatcherConfig) -> Self {
        let pending: PendingBatch = Rc::new(RefCell::new(None));

        let sink = pending.clone();
        let batcher = RenderBatcher::new(ticks.clock().clone(), config, move |continuation| {
            // One batch per tick: a newer request replaces an older one
            *sink.borrow_mut() = Some(continuation);
        });

        let source = pending.clone();
        let after_tick = ticks.on_after_tick(move || {
            let continuation = source.borrow_mut().take();
            if let Some(continuation) = continuation {
                continuation();
            }
        });

        Self {
            batcher,
            pending,
            _after_tick: after_tick,
        }
    }

    pub fn batcher(&self) -> &RenderBatcher {
        &self.batcher
    }

    /// Whether a batch will run on the next tick
    pub fn has_pending_batch(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Phase;
    use crate::render_step::FrameProcess;
    use crate::tick::ManualDriver;
    use std::cell::Cell;

    #[test]
    fn test_batches_follow_ticks() {
        let ticks = TickSystem::new();
        let driver = Rc::new(ManualDriver::new());
        ticks.initialize(driver.clone());
        let frame_loop = FrameLoop::attach(&ticks, BatcherConfig::default());

        let stamps = Rc::new(RefCell::new(Vec::new()));
        let stamps_clone = stamps.clone();
        frame_loop.batcher().schedule(
            Phase::Update,
            FrameProcess::new(move |f| stamps_clone.borrow_mut().push(f.now)),
            true,
            false,
        );
        assert!(frame_loop.has_pending_batch());

        for _ in 0..3 {
            driver.advance(16.0);
            ticks.tick();
        }

        assert_eq!(*stamps.borrow(), vec![16.0, 32.0, 48.0]);
        assert!(frame_loop.has_pending_batch());
    }

    #[test]
    fn test_idle_loop_stops_requesting() {
        let ticks = TickSystem::new();
        let driver = Rc::new(ManualDriver::new());
        ticks.initialize(driver.clone());
        let frame_loop = FrameLoop::attach(&ticks, BatcherConfig::default());

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        frame_loop
            .batcher()
            .schedule_fn(Phase::Render, move |_| runs_clone.set(runs_clone.get() + 1));

        driver.advance(16.0);
        ticks.tick();
        driver.advance(16.0);
        ticks.tick();

        assert_eq!(runs.get(), 1);
        assert!(!frame_loop.has_pending_batch());
    }
}
