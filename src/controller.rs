//! Adaptive step size control.

use crate::constants::step_control::*;

/// Used for adaptive step size control
#[derive(Clone, Copy, Debug)]
pub struct Controller {
    rel_error: f64,
    h_max: f64,
}

impl Controller {
    /// Creates a controller responsible for adaptive step size control.
    ///
    /// # Arguments
    ///
    /// * `rel_error`   - Relative error tolerance the error estimate is compared against
    /// * `h_max`       - Maximum step size
    ///
    pub fn new(rel_error: f64, h_max: f64) -> Controller {
        Controller { rel_error, h_max }
    }

    /// Returns the smallest step size that still moves `x`.
    pub fn h_min(x: f64) -> f64 {
        MIN_STEP_ULPS * ulp(x)
    }

    /// Brings `h` into `[h_min, h_max]`.
    pub fn clamp(&self, h: f64, h_min: f64) -> f64 {
        let h = if h < h_min { h_min } else { h };
        if h > self.h_max {
            self.h_max
        } else {
            h
        }
    }

    /// Chooses the first trial step from the derivative at the initial point.
    ///
    /// # Arguments
    ///
    /// * `span`        - Distance to the first output point
    /// * `y`           - Initial state
    /// * `f`           - Derivative at the initial state
    /// * `threshold`   - Floor of the magnitude of the state components
    ///
    pub fn initial_step(&self, span: f64, y: &[f64], f: &[f64], threshold: f64) -> f64 {
        let h = span.min(self.h_max);

        let scale = y
            .iter()
            .zip(f)
            .map(|(y_i, f_i)| (f_i / y_i.abs().max(threshold)).abs())
            .fold(0.0, f64::max);
        let scale = scale / (SAFETY_FACTOR * self.rel_error.powf(POWER));

        if h * scale > 1.0 {
            1.0 / scale
        } else {
            h
        }
    }

    /// Determines if a trial step with error estimate `err` must be accepted.
    pub fn accept(&self, err: f64) -> bool {
        err <= self.rel_error
    }

    /// Shrinks the step after a rejection. `repeated` tells if the same step has
    /// already been rejected before.
    pub fn shrink(&self, h: f64, err: f64, repeated: bool) -> f64 {
        if repeated {
            return REPEATED_SHRINK_FACTOR * h;
        }
        let factor = SAFETY_FACTOR * (self.rel_error / err).powf(POWER);
        if factor > MIN_SHRINK_FACTOR {
            factor * h
        } else {
            MIN_SHRINK_FACTOR * h
        }
    }

    /// Computes the next trial step after a step accepted at its first attempt.
    pub fn next(&self, h: f64, err: f64) -> f64 {
        let scale = GROWTH_DIVISOR * (err / self.rel_error).powf(POWER);
        if scale > 1.0 / MAX_GROWTH_FACTOR {
            h / scale
        } else {
            MAX_GROWTH_FACTOR * h
        }
    }
}

/// Distance from `|x|` to the next larger representable number.
fn ulp(x: f64) -> f64 {
    let x = x.abs();
    if !x.is_finite() {
        return f64::NAN;
    }
    f64::from_bits(x.to_bits() + 1) - x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h_min() {
        assert_eq!(Controller::h_min(1.0), 16.0 * f64::EPSILON);
        assert_eq!(Controller::h_min(-1.0), 16.0 * f64::EPSILON);
        assert_eq!(Controller::h_min(0.0), 16.0 * f64::from_bits(1));
        assert_eq!(Controller::h_min(2.0), 32.0 * f64::EPSILON);
    }

    #[test]
    fn test_clamp() {
        let controller = Controller::new(1e-3, 0.1);
        assert_eq!(controller.clamp(0.05, 1e-10), 0.05);
        assert_eq!(controller.clamp(0.5, 1e-10), 0.1);
        assert_eq!(controller.clamp(1e-12, 1e-10), 1e-10);
    }

    #[test]
    fn test_initial_step() {
        let controller = Controller::new(1e-3, 0.1);

        // Nothing happens: the step is limited by the span and the maximum.
        assert_eq!(controller.initial_step(1.0, &[1.0], &[0.0], 1e-3), 0.1);
        assert_eq!(controller.initial_step(0.05, &[1.0], &[0.0], 1e-3), 0.05);

        // Fast dynamics shorten the step.
        let h = controller.initial_step(1.0, &[1.0, 0.0], &[100.0, 1.0], 1e-3);
        let scale: f64 = 1000.0 / (0.8 * 1e-3_f64.powf(0.2));
        assert!((h * scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_shrink() {
        let controller = Controller::new(1e-3, 1.0);

        let h = controller.shrink(1.0, 32e-3, false);
        assert!((h - 0.4).abs() < 1e-12);

        // Never by more than a factor of ten.
        assert_eq!(controller.shrink(1.0, 1e10, false), 0.1);

        // Halved after a repeated rejection, whatever the error.
        assert_eq!(controller.shrink(1.0, 2e-3, true), 0.5);
    }

    #[test]
    fn test_next() {
        let controller = Controller::new(1e-3, 1.0);

        // Close to the tolerance the step shrinks a little.
        assert!(controller.next(1.0, 1e-3) < 1.0);

        // Far below the tolerance the step grows five times.
        assert_eq!(controller.next(1.0, 1e-10), 5.0);
        assert_eq!(controller.next(1.0, 0.0), 5.0);

        // (31.25e-6 / 1e-3)^(1/5) = 1/2
        let h = controller.next(1.0, 31.25e-6);
        assert!((h - 1.0 / (1.25 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_accept() {
        let controller = Controller::new(1e-3, 1.0);
        assert!(controller.accept(1e-3));
        assert!(controller.accept(0.0));
        assert!(!controller.accept(1.1e-3));
    }
}
