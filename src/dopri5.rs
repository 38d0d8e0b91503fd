//! Explicit Runge-Kutta method with Dormand-Prince coefficients of order 5(4) and dense output of order 4.

use crate::butcher_tableau::dopri54::{A, C, E, STAGES};
use crate::constants::{step_control, tolerance};
use crate::controller::Controller;
use crate::dop_shared::*;
use crate::output::{FixedGrid, FreeRunning, OutputWriter, Step};

use tracing::{debug, trace};

/// Configuration of the integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Initial step size. If zero, it is chosen from the derivative at the initial point.
    pub try_step: f64,
    /// Maximum step size. If zero, a tenth of the interval of integration.
    pub max_step: f64,
    /// Absolute error tolerance.
    pub abs_error: f64,
    /// Relative error tolerance.
    pub rel_error: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            try_step: 0.0,
            max_step: 0.0,
            abs_error: tolerance::ABS_ERROR,
            rel_error: tolerance::REL_ERROR,
        }
    }
}

impl Config {
    /// Checks the bounds of every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Comparisons are negated so that NaN fails them.
        if !(self.try_step >= 0.0) {
            return Err(ConfigError::NegativeTryStep(self.try_step));
        }
        if !(self.max_step >= 0.0) {
            return Err(ConfigError::NegativeMaxStep(self.max_step));
        }
        if !(self.abs_error > 0.0) {
            return Err(ConfigError::NonPositiveAbsError(self.abs_error));
        }
        if !(self.rel_error > 0.0) {
            return Err(ConfigError::NonPositiveRelError(self.rel_error));
        }
        Ok(())
    }
}

/// Dormand-Prince 5(4) integrator.
///
/// Holds only its configuration: every call to [`Dopri5::compute`] allocates its
/// own working buffers, so one integrator can be reused for any number of problems.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dopri5 {
    config: Config,
}

impl Dopri5 {
    /// Creates an integrator after validating `config`.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Integrates the system of differential equations `dy/dx = f(x, y)`.
    ///
    /// If `xs` has more than two entries, the solution is returned at exactly these
    /// points, using dense output between the steps. Otherwise the solution is
    /// returned at the points the step size control lands on.
    pub fn compute<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<Solution, IntegrationError> {
        self.compute_with_stats(system, y0, xs)
            .map(|(solution, _)| solution)
    }

    /// Same as [`Dopri5::compute`], also returning the statistics of the run.
    pub fn compute_with_stats<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<(Solution, Stats), IntegrationError> {
        validate_problem(y0, xs)?;
        if xs.len() > 2 {
            self.integrate(system, y0, xs, FixedGrid::new(xs, y0.len()))
        } else {
            self.integrate(system, y0, xs, FreeRunning::new(y0.len()))
        }
    }

    /// Core integration method.
    fn integrate<S, W>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
        mut writer: W,
    ) -> Result<(Solution, Stats), IntegrationError>
    where
        S: System + ?Sized,
        W: OutputWriter,
    {
        let config = &self.config;
        let threshold = config.abs_error / config.rel_error;
        let (mut x, x_end) = (xs[0], xs[xs.len() - 1]);
        let mut stats = Stats::new();

        // Prepare the first iteration
        let mut work = Workspace::new(y0);
        system.system(x, &work.y, &mut work.k[..y0.len()]);
        stats.num_eval += 1;

        let h_max = if config.max_step > 0.0 {
            config.max_step
        } else {
            step_control::DEFAULT_MAX_STEP_FRACTION * (x_end - x)
        };
        let controller = Controller::new(config.rel_error, h_max);

        let mut h = if config.try_step > 0.0 {
            config.try_step
        } else {
            controller.initial_step(xs[1] - x, &work.y, work.stage(0), threshold)
        };
        debug!(nd = y0.len(), points = xs.len(), x, x_end, h, h_max, "starting integration");

        writer.start(x, y0);

        // Main loop
        loop {
            stats.num_steps += 1;

            let h_min = Controller::h_min(x);
            h = controller.clamp(h, h_min);

            // Check if it's the last iteration
            let mut last = false;
            if step_control::TERMINAL_STRETCH * h >= x_end - x {
                h = x_end - x;
                last = true;
            }

            let mut rejected = false;
            let err = loop {
                let err = work.attempt(system, x, h, threshold);
                stats.num_eval += 6;

                if controller.accept(err) {
                    break err;
                }

                stats.rejected_steps += 1;
                trace!(x, h, err, "step rejected");

                if h <= h_min {
                    debug!(x, h, %stats, "step size underflow");
                    return Err(IntegrationError::StepSizeUnderflow { x, h, stats });
                }

                h = controller.shrink(h, err, rejected);
                if h < h_min {
                    h = h_min;
                }
                last = false;
                rejected = true;
            };

            let x_new = if last { x_end } else { x + h };
            writer.record(&Step {
                x,
                y: &work.y,
                x_new,
                y_new: &work.y_new,
                h,
                k: &work.k,
            });

            if last {
                break;
            }

            x = x_new;
            work.advance();

            if !rejected {
                h = controller.next(h, err);
            }
        }

        debug!(x_end, %stats, "integration finished");
        Ok((writer.finish(), stats))
    }
}

impl Integrator for Dopri5 {
    fn compute<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<Solution, IntegrationError> {
        Dopri5::compute(self, system, y0, xs)
    }
}

/// Working buffers of one call, allocated once and reused by every step.
struct Workspace {
    nd: usize,
    /// State at the start of the current step.
    y: Vec<f64>,
    /// Input of the stage being evaluated.
    z: Vec<f64>,
    /// Fifth-order solution at the end of the trial step.
    y_new: Vec<f64>,
    /// Stage derivatives, stage `s` at offset `s * nd`.
    k: Vec<f64>,
}

impl Workspace {
    fn new(y0: &[f64]) -> Self {
        let nd = y0.len();
        Self {
            nd,
            y: y0.to_vec(),
            z: vec![0.0; nd],
            y_new: vec![0.0; nd],
            k: vec![0.0; STAGES * nd],
        }
    }

    fn stage(&self, s: usize) -> &[f64] {
        &self.k[s * self.nd..(s + 1) * self.nd]
    }

    /// Evaluates the stages of a step of size `h` from `(x, y)`, leaving the new
    /// state in `y_new`, and returns the scaled error estimate.
    ///
    /// Stage 0 must already hold the derivative at `(x, y)`.
    fn attempt<S: System + ?Sized>(&mut self, system: &S, x: f64, h: f64, threshold: f64) -> f64 {
        let nd = self.nd;
        for s in 1..STAGES {
            let (known, rest) = self.k.split_at_mut(s * nd);
            let target: &mut [f64] = if s == STAGES - 1 {
                &mut self.y_new
            } else {
                &mut self.z
            };
            for i in 0..nd {
                let mut sum = 0.0;
                for (j, a) in A[s][..s].iter().enumerate() {
                    sum += a * known[j * nd + i];
                }
                target[i] = self.y[i] + h * sum;
            }
            system.system(x + C[s] * h, target, &mut rest[..nd]);
        }
        self.error_norm(h, threshold)
    }

    /// Maximum over the components of the local error relative to the magnitude
    /// of the state, floored at `threshold`.
    fn error_norm(&self, h: f64, threshold: f64) -> f64 {
        let nd = self.nd;
        let mut err: f64 = 0.0;
        for i in 0..nd {
            let scale = self.y[i].abs().max(self.y_new[i].abs()).max(threshold);
            let mut e = 0.0;
            for (j, weight) in E.iter().enumerate() {
                e += weight * self.k[j * nd + i];
            }
            err = err.max(h * e.abs() / scale);
        }
        err
    }

    /// Moves to the end of the accepted step, reusing its last stage as the first
    /// stage of the next one.
    fn advance(&mut self) {
        let nd = self.nd;
        self.k.copy_within((STAGES - 1) * nd.., 0);
        self.y.copy_from_slice(&self.y_new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Harmonic oscillator recording the points it is evaluated at.
    struct Toy {
        evaluations: RefCell<Vec<f64>>,
    }

    impl System for Toy {
        fn system(&self, x: f64, y: &[f64], dy: &mut [f64]) {
            self.evaluations.borrow_mut().push(x);
            dy[0] = y[1];
            dy[1] = -y[0];
        }
    }

    /// Points the derivative is evaluated at: the initial point, then six stages per step.
    const TOY_TRACE: [f64; 61] = [
        0.0,
        0.020000000000000004, 0.03, 0.08000000000000002, 0.08888888888888889, 0.1, 0.1,
        0.12000000000000001, 0.13, 0.18000000000000002, 0.18888888888888888, 0.2, 0.2,
        0.22000000000000003, 0.23, 0.28, 0.2888888888888889, 0.30000000000000004, 0.30000000000000004,
        0.32000000000000006, 0.33000000000000007, 0.38000000000000006, 0.38888888888888895, 0.4, 0.4,
        0.42000000000000004, 0.43000000000000005, 0.48000000000000004, 0.48888888888888893, 0.5, 0.5,
        0.52, 0.53, 0.5800000000000001, 0.5888888888888889, 0.6, 0.6,
        0.62, 0.63, 0.6799999999999999, 0.6888888888888889, 0.7, 0.7,
        0.72, 0.73, 0.78, 0.7888888888888889, 0.7999999999999999, 0.7999999999999999,
        0.82, 0.83, 0.8799999999999999, 0.8888888888888888, 0.8999999999999999, 0.8999999999999999,
        0.9199999999999999, 0.9299999999999999, 0.98, 0.9888888888888889, 1.0, 1.0,
    ];

    fn toy_grid() -> Vec<f64> {
        (0..=10).map(|i| i as f64 / 10.0).collect()
    }

    #[test]
    fn test_toy_trace() {
        let toy = Toy {
            evaluations: RefCell::new(Vec::new()),
        };
        let integrator = Dopri5::new(Config {
            try_step: 0.1,
            ..Config::default()
        })
        .unwrap();

        let xs = toy_grid();
        let (solution, stats) = integrator
            .compute_with_stats(&toy, &[1.0, 0.0], &xs)
            .unwrap();

        assert_eq!(
            stats,
            Stats {
                num_eval: 61,
                num_steps: 10,
                rejected_steps: 0
            }
        );
        assert_eq!(solution.len(), 11);

        assert_eq!(toy.evaluations.into_inner(), TOY_TRACE.to_vec());

        for (x, row) in solution.xs().iter().zip(solution.rows()) {
            assert!((row[0] - x.cos()).abs() < 1e-6);
            assert!((row[1] + x.sin()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_invalid_config() {
        let config = Config::default();
        assert_eq!(
            Dopri5::new(Config {
                try_step: -1.0,
                ..config
            })
            .unwrap_err(),
            ConfigError::NegativeTryStep(-1.0)
        );
        assert_eq!(
            Dopri5::new(Config {
                max_step: -1.0,
                ..config
            })
            .unwrap_err(),
            ConfigError::NegativeMaxStep(-1.0)
        );
        assert_eq!(
            Dopri5::new(Config {
                abs_error: 0.0,
                ..config
            })
            .unwrap_err(),
            ConfigError::NonPositiveAbsError(0.0)
        );
        assert_eq!(
            Dopri5::new(Config {
                rel_error: -1e-3,
                ..config
            })
            .unwrap_err(),
            ConfigError::NonPositiveRelError(-1e-3)
        );
        assert!(Dopri5::new(Config {
            rel_error: f64::NAN,
            ..config
        })
        .is_err());
        assert!(Dopri5::new(config).is_ok());
    }

    #[test]
    fn test_step_size_underflow() {
        // The jump of the derivative right after x = 1 cannot be resolved.
        let system = |x: f64, _y: &[f64], dy: &mut [f64]| {
            dy[0] = if x > 1.0 { 1.0 } else { 0.0 };
        };
        let integrator = Dopri5::new(Config {
            try_step: 0.1,
            max_step: 0.0,
            abs_error: 1e-300,
            rel_error: 1e-300,
        })
        .unwrap();

        match integrator.compute(&system, &[1.0], &[1.0, 2.0]) {
            Err(IntegrationError::StepSizeUnderflow { x, h, stats }) => {
                assert_eq!(x, 1.0);
                assert!(h <= Controller::h_min(1.0));
                assert_eq!(stats.num_steps, 1);
                assert!(stats.rejected_steps > 1);
                assert_eq!(stats.num_eval, 1 + 6 * stats.rejected_steps);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_grid() {
        let system = |_x: f64, y: &[f64], dy: &mut [f64]| dy[0] = y[0];
        let integrator = Dopri5::default();
        assert_eq!(
            integrator.compute(&system, &[1.0], &[0.0]).unwrap_err(),
            IntegrationError::TooFewPoints { len: 1 }
        );
        assert_eq!(
            integrator.compute(&system, &[1.0], &[1.0, 1.0]).unwrap_err(),
            IntegrationError::EmptyInterval {
                start: 1.0,
                end: 1.0
            }
        );
    }

    #[test]
    fn test_advance_reuses_last_stage() {
        let mut work = Workspace::new(&[1.0, 2.0]);
        for (i, value) in work.k.iter_mut().enumerate() {
            *value = i as f64;
        }
        work.y_new.copy_from_slice(&[3.0, 4.0]);
        work.advance();
        assert_eq!(work.stage(0), &[12.0, 13.0]);
        assert_eq!(work.y, vec![3.0, 4.0]);
    }
}
