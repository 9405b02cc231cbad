//! Synchronized clock
//!
//! Every motion value that reads the time during a tick must see the same
//! timestamp, otherwise velocity tracking would treat two writes from the
//! same frame as two different frames. The clock caches the first reading
//! taken inside a tick and hands it back until the tick ends.

use crate::frame::FrameData;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of wall-clock time in milliseconds
pub type TimeSource = Rc<dyn Fn() -> f64>;

struct ClockInner {
    time_source: TimeSource,
    /// Frame currently being ticked, if any
    frame: Cell<Option<FrameData>>,
    /// Timestamp handed out for the current tick
    cached: Cell<Option<f64>>,
}

/// A cheap-to-clone handle to a tick-synchronized clock
#[derive(Clone)]
pub struct SyncClock {
    inner: Rc<ClockInner>,
}

impl SyncClock {
    /// Create a clock backed by a monotonic wall clock
    pub fn new() -> Self {
        let epoch = Instant::now();
        Self::with_time_source(move || epoch.elapsed().as_secs_f64() * 1000.0)
    }

    /// Create a clock backed by a custom time source
    ///
    /// Hosts with their own timeline (and tests) use this to make the
    /// fallback time deterministic.
    pub fn with_time_source<F>(source: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        Self {
            inner: Rc::new(ClockInner {
                time_source: Rc::new(source),
                frame: Cell::new(None),
                cached: Cell::new(None),
            }),
        }
    }

    /// Current time in milliseconds
    ///
    /// Inside a tick the value is stable: the first call caches either the
    /// frame timestamp (while the frame is being processed) or the wall
    /// clock, and every later call returns the cached value.
    pub fn now(&self) -> f64 {
        if let Some(cached) = self.inner.cached.get() {
            return cached;
        }

        match self.inner.frame.get() {
            Some(frame) => {
                let now = if frame.is_processing {
                    frame.now
                } else {
                    (self.inner.time_source)()
                };
                self.inner.cached.set(Some(now));
                now
            }
            None => (self.inner.time_source)(),
        }
    }

    /// Begin a tick with the given frame data
    pub fn sync(&self, frame: FrameData) {
        self.inner.frame.set(Some(frame));
        self.inner.cached.set(None);
    }

    /// End the current tick so the next read recomputes
    pub fn clear(&self) {
        self.inner.frame.set(None);
        self.inner.cached.set(None);
    }

    /// Whether a tick is currently synchronized
    pub fn is_synced(&self) -> bool {
        self.inner.frame.get().is_some()
    }

    /// Frame data of the current tick
    pub fn frame(&self) -> Option<FrameData> {
        self.inner.frame.get()
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SyncClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClock")
            .field("frame", &self.inner.frame.get())
            .field("cached", &self.inner.cached.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock() -> (SyncClock, Rc<Cell<f64>>) {
        let time = Rc::new(Cell::new(0.0));
        let source = time.clone();
        (SyncClock::with_time_source(move || source.get()), time)
    }

    #[test]
    fn test_wall_clock_outside_tick() {
        let (clock, time) = manual_clock();
        time.set(10.0);
        assert_eq!(clock.now(), 10.0);
        time.set(20.0);
        assert_eq!(clock.now(), 20.0);
    }

    #[test]
    fn test_stable_within_tick() {
        let (clock, time) = manual_clock();
        time.set(5.0);
        clock.sync(FrameData::new(16.0, 100.0));

        // Frame is not being processed, so the wall clock is cached
        assert_eq!(clock.now(), 5.0);
        time.set(9.0);
        assert_eq!(clock.now(), 5.0);

        clock.clear();
        assert_eq!(clock.now(), 9.0);
    }

    #[test]
    fn test_processing_frame_timestamp() {
        let (clock, time) = manual_clock();
        time.set(5.0);
        clock.sync(FrameData {
            delta: 16.0,
            now: 100.0,
            is_processing: true,
        });

        assert_eq!(clock.now(), 100.0);
        assert!(clock.is_synced());

        clock.clear();
        assert!(!clock.is_synced());
        assert_eq!(clock.now(), 5.0);
    }
}
