//! Writers collecting the solution as the integration proceeds.
//!
//! The integrator picks one writer per call and is monomorphized over it, so
//! the step loop never branches on the output mode.

use crate::dense_output::interpolate;
use crate::dop_shared::Solution;

/// An accepted step handed to an [`OutputWriter`].
pub struct Step<'a> {
    /// Start of the step.
    pub x: f64,
    /// State at the start of the step.
    pub y: &'a [f64],
    /// End of the step.
    pub x_new: f64,
    /// State at the end of the step.
    pub y_new: &'a [f64],
    /// Size of the step.
    pub h: f64,
    /// Stage derivatives of the step, stored stage after stage.
    pub k: &'a [f64],
}

/// Collects output rows.
pub trait OutputWriter {
    /// Records the initial condition.
    fn start(&mut self, x0: f64, y0: &[f64]);
    /// Records whatever the accepted step covers.
    fn record(&mut self, step: &Step);
    /// Hands over the collected solution.
    fn finish(self) -> Solution;
}

/// Writes the solution at caller-chosen points, interpolating inside steps.
pub struct FixedGrid<'a> {
    xs: &'a [f64],
    ys: Vec<f64>,
    nd: usize,
    next: usize,
}

impl<'a> FixedGrid<'a> {
    pub fn new(xs: &'a [f64], nd: usize) -> Self {
        Self {
            xs,
            ys: vec![0.0; xs.len() * nd],
            nd,
            next: 0,
        }
    }
}

impl OutputWriter for FixedGrid<'_> {
    fn start(&mut self, _x0: f64, y0: &[f64]) {
        self.ys[..self.nd].copy_from_slice(y0);
        self.next = 1;
    }

    fn record(&mut self, step: &Step) {
        let nd = self.nd;
        while self.next < self.xs.len() {
            let x_next = self.xs[self.next];
            if step.x_new < x_next {
                break;
            }
            let row = &mut self.ys[self.next * nd..(self.next + 1) * nd];
            if x_next == step.x_new {
                row.copy_from_slice(step.y_new);
            } else {
                interpolate(step.x, step.y, step.k, step.h, x_next, row);
            }
            self.next += 1;
        }
    }

    fn finish(self) -> Solution {
        Solution::new(self.nd, self.xs.to_vec(), self.ys)
    }
}

/// Appends every point the integrator steps on.
pub struct FreeRunning {
    xs: Vec<f64>,
    ys: Vec<f64>,
    nd: usize,
}

impl FreeRunning {
    pub fn new(nd: usize) -> Self {
        Self {
            xs: Vec::with_capacity(2),
            ys: Vec::with_capacity(2 * nd),
            nd,
        }
    }
}

impl OutputWriter for FreeRunning {
    fn start(&mut self, x0: f64, y0: &[f64]) {
        self.xs.push(x0);
        self.ys.extend_from_slice(y0);
    }

    fn record(&mut self, step: &Step) {
        self.xs.push(step.x_new);
        self.ys.extend_from_slice(step.y_new);
    }

    fn finish(self) -> Solution {
        Solution::new(self.nd, self.xs, self.ys)
    }
}
