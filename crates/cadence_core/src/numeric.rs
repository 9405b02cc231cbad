//! Value type capabilities
//!
//! Two small traits describe what the engine may do with a value type:
//!
//! - [`MotionType`]: anything a motion value can hold. Types that map to a
//!   scalar opt into velocity tracking through [`MotionType::to_scalar`].
//! - [`Numeric`]: types that can be interpolated. Keyframe mixing is built
//!   on `zero`/`add`/`sub`/`scale`, so vector and color types plug in
//!   without touching the interpolation code.

/// Trait for types that support interpolation arithmetic
pub trait Numeric: Clone {
    fn zero() -> Self;

    fn add(&self, other: &Self) -> Self;

    fn sub(&self, other: &Self) -> Self;

    fn scale(&self, factor: f64) -> Self;

    /// Linearly mix from `from` to `to` by `progress` (0.0 to 1.0)
    fn mix(from: &Self, to: &Self, progress: f64) -> Self {
        from.add(&to.sub(from).scale(progress))
    }
}

/// Trait for types a motion value can hold
pub trait MotionType: Clone + PartialEq + 'static {
    /// Scalar view used for velocity tracking
    ///
    /// Types returning `None` always report zero velocity.
    fn to_scalar(&self) -> Option<f64> {
        None
    }
}

// ============================================================================
// Scalars
// ============================================================================

impl Numeric for f64 {
    fn zero() -> Self {
        0.0
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn scale(&self, factor: f64) -> Self {
        self * factor
    }

    fn mix(from: &Self, to: &Self, progress: f64) -> Self {
        from + (to - from) * progress
    }
}

impl Numeric for f32 {
    fn zero() -> Self {
        0.0
    }

    fn add(&self, other: &Self) -> Self {
        self + other
    }

    fn sub(&self, other: &Self) -> Self {
        self - other
    }

    fn scale(&self, factor: f64) -> Self {
        (*self as f64 * factor) as f32
    }

    fn mix(from: &Self, to: &Self, progress: f64) -> Self {
        from + (to - from) * progress as f32
    }
}

impl MotionType for f64 {
    fn to_scalar(&self) -> Option<f64> {
        Some(*self)
    }
}

impl MotionType for f32 {
    fn to_scalar(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl MotionType for i32 {
    fn to_scalar(&self) -> Option<f64> {
        Some(*self as f64)
    }
}

impl MotionType for bool {}

impl MotionType for String {}

impl MotionType for &'static str {}

// ============================================================================
// Fixed-size vectors (positions, scales, colors)
// ============================================================================

impl<const N: usize> Numeric for [f32; N] {
    fn zero() -> Self {
        [0.0; N]
    }

    fn add(&self, other: &Self) -> Self {
        std::array::from_fn(|i| self[i] + other[i])
    }

    fn sub(&self, other: &Self) -> Self {
        std::array::from_fn(|i| self[i] - other[i])
    }

    fn scale(&self, factor: f64) -> Self {
        std::array::from_fn(|i| (self[i] as f64 * factor) as f32)
    }
}

impl<const N: usize> MotionType for [f32; N] {}

impl<const N: usize> Numeric for [f64; N] {
    fn zero() -> Self {
        [0.0; N]
    }

    fn add(&self, other: &Self) -> Self {
        std::array::from_fn(|i| self[i] + other[i])
    }

    fn sub(&self, other: &Self) -> Self {
        std::array::from_fn(|i| self[i] - other[i])
    }

    fn scale(&self, factor: f64) -> Self {
        std::array::from_fn(|i| self[i] * factor)
    }
}

impl<const N: usize> MotionType for [f64; N] {}
