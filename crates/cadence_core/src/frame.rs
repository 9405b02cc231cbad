//! Per-tick frame data and render phases

/// Default frame delta used when no measured delta is available (60fps)
pub const DEFAULT_FRAME_DELTA_MS: f64 = 1000.0 / 60.0;

/// Timing information for a single tick
///
/// Produced once per tick by the driver (or the batcher) and handed by
/// reference to everything that runs inside that tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameData {
    /// Milliseconds elapsed since the previous frame
    pub delta: f64,
    /// Timestamp of this frame in milliseconds
    pub now: f64,
    /// Whether the frame is currently being processed
    pub is_processing: bool,
}

impl FrameData {
    pub fn new(delta: f64, now: f64) -> Self {
        Self {
            delta,
            now,
            is_processing: false,
        }
    }
}

/// The ordered render phases of a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Read,
    ResolveKeyframes,
    PreUpdate,
    Update,
    PreRender,
    Render,
    PostRender,
}

impl Phase {
    /// Every phase, in execution order
    pub const ALL: [Phase; 8] = [
        Phase::Setup,
        Phase::Read,
        Phase::ResolveKeyframes,
        Phase::PreUpdate,
        Phase::Update,
        Phase::PreRender,
        Phase::Render,
        Phase::PostRender,
    ];

    /// Position of this phase within a batch
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
        assert_eq!(Phase::ALL[0], Phase::Setup);
        assert_eq!(Phase::ALL[7], Phase::PostRender);
    }
}
