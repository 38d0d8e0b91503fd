//! Explicit Runge-Kutta method of order 4 with fixed step size.

use crate::dop_shared::*;

use tracing::debug;

/// Configuration of the integrator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Step size used in the method.
    pub step: f64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.step > 0.0) {
            return Err(ConfigError::NonPositiveStep(self.step));
        }
        Ok(())
    }
}

/// Classical fourth-order Runge-Kutta integrator.
#[derive(Clone, Copy, Debug)]
pub struct Rk4 {
    config: Config,
}

impl Rk4 {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Integrates with equidistant steps starting from `xs[0]`. The last point is the
    /// one closest to `xs[xs.len() - 1]` on that grid; intermediate entries of `xs`
    /// are ignored.
    pub fn compute_with_stats<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<(Solution, Stats), IntegrationError> {
        validate_problem(y0, xs)?;

        let nd = y0.len();
        let h = self.config.step;
        let half_step = h / 2.0;
        let x0 = xs[0];
        let (num_points, mut x_out, mut y_out) = allocate_output(x0, xs[xs.len() - 1], h, nd)?;

        let mut stats = Stats::new();
        let mut z = vec![0.0; nd];
        let mut stages = vec![0.0; 4 * nd];

        // Save initial values
        x_out.push(x0);
        y_out[..nd].copy_from_slice(y0);

        let mut x = x0;
        for step in 1..num_points {
            let (done, rest) = y_out.split_at_mut(step * nd);
            let y = &done[(step - 1) * nd..];
            let y_new = &mut rest[..nd];

            let (k1, tail) = stages.split_at_mut(nd);
            let (k2, tail) = tail.split_at_mut(nd);
            let (k3, k4) = tail.split_at_mut(nd);

            system.system(x, y, k1);
            for i in 0..nd {
                z[i] = y[i] + half_step * k1[i];
            }
            system.system(x + half_step, &z, k2);
            for i in 0..nd {
                z[i] = y[i] + half_step * k2[i];
            }
            system.system(x + half_step, &z, k3);
            for i in 0..nd {
                z[i] = y[i] + h * k3[i];
            }
            system.system(x + h, &z, k4);

            for i in 0..nd {
                y_new[i] = y[i] + h * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0;
            }

            x = x0 + step as f64 * h;
            x_out.push(x);

            stats.num_eval += 4;
            stats.num_steps += 1;
        }

        debug!(x, %stats, "integration finished");
        Ok((Solution::new(nd, x_out, y_out), stats))
    }
}

/// Counts the points of the equidistant grid and reserves the output for them.
fn allocate_output(
    x0: f64,
    x_end: f64,
    h: f64,
    nd: usize,
) -> Result<(usize, Vec<f64>, Vec<f64>), IntegrationError> {
    let points = ((x_end - x0) / h + 0.5).floor() + 1.0;
    let too_many = IntegrationError::TooManyPoints {
        points,
        dimension: nd,
    };

    // `usize::MAX as f64` rounds up, hence the strict comparison.
    if !(points < usize::MAX as f64) {
        return Err(too_many);
    }
    let num_points = points as usize;
    let len = num_points.checked_mul(nd).ok_or(too_many)?;

    let mut y_out = Vec::new();
    y_out.try_reserve_exact(len).map_err(|_| too_many)?;
    y_out.resize(len, 0.0);
    let mut x_out = Vec::new();
    x_out.try_reserve_exact(num_points).map_err(|_| too_many)?;

    Ok((num_points, x_out, y_out))
}

impl Integrator for Rk4 {
    fn compute<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<Solution, IntegrationError> {
        self.compute_with_stats(system, y0, xs)
            .map(|(solution, _)| solution)
    }
}
