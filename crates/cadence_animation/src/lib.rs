//! Cadence Animation System
//!
//! Generators and controllers that drive [`cadence_core::MotionValue`]s.
//!
//! # Features
//!
//! - **Keyframes**: timed sequences over any `Numeric` type, with offsets
//!   and per-segment easing
//! - **Spring Physics**: closed-form damped springs with presets and
//!   duration/bounce resolution
//! - **Value Animations**: play/pause/stop/cancel controllers ticked by the
//!   motion system, with completion handles
//! - **Spring Values**: motion values that spring towards every write,
//!   carrying velocity across interruptions

pub mod animation;
pub mod completion;
pub mod easing;
pub mod generator;
pub mod keyframes;
pub mod spring;
pub mod spring_value;

pub use animation::{PlayState, ValueAnimation};
pub use completion::{CompletionHandle, CompletionState};
pub use easing::Easing;
pub use generator::{
    calc_generator_duration, AnimationState, KeyframeGenerator, GENERATOR_DURATION_STEP_MS,
    MAX_GENERATOR_DURATION_MS,
};
pub use keyframes::{Keyframes, KeyframesOptions, DEFAULT_KEYFRAMES_DURATION_MS};
pub use spring::{find_spring, ResolvedSpring, SpringGenerator, SpringOptions, DEFAULT_BOUNCE};
pub use spring_value::SpringValue;
