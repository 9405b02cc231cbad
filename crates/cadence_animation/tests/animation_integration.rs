//! Integration tests for the tick system driving value animations
//!
//! These tests verify that:
//! - Animations registered with the motion system advance once per tick
//! - Completion resolves handles and fires value events
//! - Render phases observe values written by animations in the same tick
//! - Springs interrupted mid-flight hand their velocity over

use cadence_animation::{
    Keyframes, KeyframesOptions, PlayState, SpringGenerator, SpringOptions, SpringValue,
    ValueAnimation,
};
use cadence_core::{
    BatcherConfig, FrameLoop, FrameProcess, ManualDriver, MotionValue, Phase, SyncClock,
    TickSystem,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (TickSystem, Rc<ManualDriver>) {
    init_tracing();
    let ticks = TickSystem::with_clock(SyncClock::with_time_source(|| 0.0));
    let driver = Rc::new(ManualDriver::new());
    ticks.initialize(driver.clone());
    (ticks, driver)
}

fn run_frames(ticks: &TickSystem, driver: &ManualDriver, count: usize, delta: f64) {
    for _ in 0..count {
        driver.advance(delta);
        ticks.tick();
    }
}

/// Keyframes [0, 10, 20] over 100ms, four 25ms ticks
#[test]
fn test_keyframes_end_to_end() {
    let (ticks, driver) = setup();
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let completed = Rc::new(Cell::new(false));
    let completed_clone = completed.clone();
    let _on_complete = x.on_animation_complete(move || completed_clone.set(true));

    let keyframes = Keyframes::new(vec![0.0, 10.0, 20.0], KeyframesOptions::new(100.0)).unwrap();
    let animation = ValueAnimation::new(&x, keyframes).unwrap();
    let handle = animation.finished();
    animation.play_on(ticks.motion_system());

    let mut samples = Vec::new();
    for _ in 0..4 {
        run_frames(&ticks, &driver, 1, 25.0);
        samples.push(x.get());
    }

    assert_eq!(samples, vec![5.0, 10.0, 15.0, 20.0]);
    assert_eq!(animation.state(), PlayState::Finished);
    assert!(handle.is_resolved());
    assert!(completed.get());
    assert!(ticks.motion_system().is_empty());
}

/// Change listeners see every sampled value exactly once
#[test]
fn test_change_events_per_tick() {
    let (ticks, driver) = setup();
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = x.on_change(move |v| seen_clone.borrow_mut().push(*v));

    let keyframes = Keyframes::tween(0.0, 30.0, KeyframesOptions::new(64.0)).unwrap();
    ValueAnimation::new(&x, keyframes)
        .unwrap()
        .play_on(ticks.motion_system());

    run_frames(&ticks, &driver, 6, 16.0);
    assert_eq!(*seen.borrow(), vec![7.5, 15.0, 22.5, 30.0]);
}

/// Pausing holds the value across ticks; resuming continues from there
#[test]
fn test_pause_across_ticks() {
    let (ticks, driver) = setup();
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let keyframes = Keyframes::tween(0.0, 100.0, KeyframesOptions::new(128.0)).unwrap();
    let animation = ValueAnimation::new(&x, keyframes).unwrap();
    animation.play_on(ticks.motion_system());

    run_frames(&ticks, &driver, 2, 16.0);
    animation.pause();
    run_frames(&ticks, &driver, 3, 16.0);
    assert_eq!(x.get(), 25.0);

    animation.play();
    run_frames(&ticks, &driver, 1, 16.0);
    assert_eq!(x.get(), 37.5);
}

/// Animations update before the batch, so render work sees this tick's value
#[test]
fn test_render_phase_sees_animated_value() {
    let (ticks, driver) = setup();
    let frame_loop = FrameLoop::attach(&ticks, BatcherConfig::default());
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let rendered = Rc::new(RefCell::new(Vec::new()));
    let rendered_clone = rendered.clone();
    let reader = x.clone();
    frame_loop.batcher().schedule(
        Phase::Render,
        FrameProcess::new(move |_| rendered_clone.borrow_mut().push(reader.get())),
        true,
        false,
    );

    let keyframes = Keyframes::tween(0.0, 64.0, KeyframesOptions::new(64.0)).unwrap();
    ValueAnimation::new(&x, keyframes)
        .unwrap()
        .play_on(ticks.motion_system());

    run_frames(&ticks, &driver, 4, 16.0);
    assert_eq!(*rendered.borrow(), vec![16.0, 32.0, 48.0, 64.0]);
}

/// A stopped animation leaves the value where it was and cancels its handle
#[test]
fn test_value_stop_cancels_animation() {
    let (ticks, driver) = setup();
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let cancelled = Rc::new(Cell::new(0));
    let cancelled_clone = cancelled.clone();
    let _on_cancel = x.on_animation_cancel(move || cancelled_clone.set(cancelled_clone.get() + 1));

    let keyframes = Keyframes::tween(0.0, 100.0, KeyframesOptions::new(100.0)).unwrap();
    let animation = ValueAnimation::new(&x, keyframes).unwrap();
    let handle = animation.finished();
    animation.play_on(ticks.motion_system());

    run_frames(&ticks, &driver, 1, 50.0);
    x.stop();
    run_frames(&ticks, &driver, 2, 50.0);

    assert_eq!(x.get(), 50.0);
    assert_eq!(animation.state(), PlayState::Idle);
    assert!(handle.is_cancelled());
    assert_eq!(cancelled.get(), 1);
    assert!(ticks.motion_system().is_empty());
}

/// A spring animation converges exactly onto its target
#[test]
fn test_spring_animation_settles() {
    let (ticks, driver) = setup();
    let x = MotionValue::new(ticks.clock(), 0.0_f64);

    let spring = SpringGenerator::new(0.0, 200.0, SpringOptions::gentle()).unwrap();
    let animation = ValueAnimation::new(&x, spring).unwrap();
    animation.play_on(ticks.motion_system());

    let mut frames = 0;
    while animation.state() == PlayState::Running && frames < 1000 {
        run_frames(&ticks, &driver, 1, 16.0);
        frames += 1;
    }

    assert_eq!(animation.state(), PlayState::Finished);
    assert_eq!(x.get(), 200.0);
}

/// A spring value follows a dragged value and settles where it was released
#[test]
fn test_spring_value_follows_drag() {
    let (ticks, driver) = setup();
    let pointer = MotionValue::new(ticks.clock(), 0.0_f64);
    let spring = SpringValue::new(&ticks, 0.0, SpringOptions::stiff()).unwrap();
    spring.follow(&pointer);

    for i in 1..=10 {
        pointer.set(i as f64 * 10.0);
        run_frames(&ticks, &driver, 1, 16.0);
    }
    assert!(spring.get() > 0.0 && spring.get() < 100.0);
    assert!(spring.get_velocity() > 0.0);

    run_frames(&ticks, &driver, 300, 16.0);
    assert_eq!(spring.get(), 100.0);
    assert!(!spring.is_animating());
}
