//! Cadence Core Runtime
//!
//! Frame scheduling and reactive motion values for a host-driven animation
//! engine. The host supplies ticks; nothing here starts a timer or a thread.
//!
//! # Features
//!
//! - **Render Batcher**: eight ordered phases run once per batch, with
//!   re-entrancy-safe render steps and keep-alive rescheduling
//! - **Tick System**: driver lifecycle, controller registry and an
//!   after-tick notification
//! - **Synchronized Clock**: one stable "now" per tick
//! - **Motion Values**: observable values with velocity tracking, dependents,
//!   passive effects and animation bookkeeping
//! - **Derived Values**: values recomputed from other values
//!
//! # Example
//!
//! ```
//! use cadence_core::{BatcherConfig, FrameLoop, ManualDriver, MotionValue, Phase, TickSystem};
//! use std::rc::Rc;
//!
//! let ticks = TickSystem::new();
//! let driver = Rc::new(ManualDriver::new());
//! ticks.initialize(driver.clone());
//!
//! let frame_loop = FrameLoop::attach(&ticks, BatcherConfig::default());
//! let x = MotionValue::new(ticks.clock(), 0.0_f64);
//!
//! let target = x.clone();
//! frame_loop
//!     .batcher()
//!     .schedule_fn(Phase::Update, move |frame| target.set(frame.now));
//!
//! driver.advance(16.0);
//! ticks.tick();
//! assert_eq!(x.get(), 16.0);
//! ```

pub mod batcher;
pub mod clock;
pub mod derived;
pub mod error;
pub mod frame;
pub mod frame_loop;
pub mod motion_value;
pub mod numeric;
pub mod render_step;
pub mod subscription;
pub mod tick;

pub use batcher::{BatchContinuation, BatcherConfig, RenderBatcher, ScheduleNextBatch};
pub use clock::{SyncClock, TimeSource};
pub use derived::{ChangeSource, DerivedValue};
pub use error::{MotionError, Result};
pub use frame::{FrameData, Phase, DEFAULT_FRAME_DELTA_MS};
pub use frame_loop::FrameLoop;
pub use motion_value::{
    velocity_per_second, ActiveAnimation, AnimationOutcome, Committer, MotionValue,
    PassiveEffect, ValueId, WeakMotionValue, MAX_VELOCITY_DELTA_MS,
};
pub use numeric::{MotionType, Numeric};
pub use render_step::{FrameProcess, RenderStep};
pub use subscription::{SubscriberList, Subscription};
pub use tick::{
    ControllerId, ManualDriver, MotionController, MotionSystem, TickDriver, TickSystem,
};
