/// Step size control constants
pub mod step_control {
    /// Safety factor applied to the optimal step predicted from the error
    pub const SAFETY_FACTOR: f64 = 0.8;

    /// Divisor of the step after an accepted step, equal to `1 / SAFETY_FACTOR`
    pub const GROWTH_DIVISOR: f64 = 1.25;

    /// A rejected step never shrinks by more than this factor
    pub const MIN_SHRINK_FACTOR: f64 = 0.1;

    /// Factor applied after consecutive rejections of the same step
    pub const REPEATED_SHRINK_FACTOR: f64 = 0.5;

    /// Growth factor used when the error is far below the tolerance
    pub const MAX_GROWTH_FACTOR: f64 = 5.0;

    /// Exponent of the error ratio, the inverse of the order of the method
    pub const POWER: f64 = 1.0 / 5.0;

    /// Smallest admissible step in units in the last place of `x`
    pub const MIN_STEP_ULPS: f64 = 16.0;

    /// The step is stretched to the end of the interval if `TERMINAL_STRETCH * h` reaches it
    pub const TERMINAL_STRETCH: f64 = 1.1;

    /// Maximum step as a fraction of the interval when none is configured
    pub const DEFAULT_MAX_STEP_FRACTION: f64 = 0.1;
}

/// Default tolerances
pub mod tolerance {
    /// Absolute error tolerance
    pub const ABS_ERROR: f64 = 1e-6;

    /// Relative error tolerance
    pub const REL_ERROR: f64 = 1e-3;
}
