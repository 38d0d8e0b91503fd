//! Shared traits and structures for dopri5 and rk4.

use nalgebra::DMatrix;
use std::fmt;
use thiserror::Error;

/// Trait needed to be implemented by the user.
pub trait System {
    /// System of ordinary differential equations. Stores `f(x, y)` in `dy`.
    fn system(&self, x: f64, y: &[f64], dy: &mut [f64]);
}

impl<F> System for F
where
    F: Fn(f64, &[f64], &mut [f64]),
{
    fn system(&self, x: f64, y: &[f64], dy: &mut [f64]) {
        self(x, y, dy)
    }
}

/// Common interface of the integrators.
pub trait Integrator {
    /// Integrates the system of differential equations `dy/dx = f(x, y)`.
    ///
    /// The interval of integration is `[xs[0], xs[xs.len() - 1]]` and `y0` is the
    /// initial condition at `xs[0]`. How the remaining entries of `xs` are used
    /// depends on the integrator.
    fn compute<S: System + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        xs: &[f64],
    ) -> Result<Solution, IntegrationError>;
}

/// Enumeration of the errors that may arise when configuring an integrator.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("The initial step should be nonnegative, got {0}.")]
    NegativeTryStep(f64),
    #[error("The maximal step should be nonnegative, got {0}.")]
    NegativeMaxStep(f64),
    #[error("The absolute error tolerance should be positive, got {0}.")]
    NonPositiveAbsError(f64),
    #[error("The relative error tolerance should be positive, got {0}.")]
    NonPositiveRelError(f64),
    #[error("The step of integration should be positive, got {0}.")]
    NonPositiveStep(f64),
}

/// Enumeration of the errors that may arise during integration.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum IntegrationError {
    /// No step at or above the smallest admissible one satisfies the tolerance.
    /// `stats` holds the work done up to the failure.
    #[error("Stopped at x = {x}. Step size underflow (h = {h}).")]
    StepSizeUnderflow { x: f64, h: f64, stats: Stats },
    #[error("The grid should contain at least two points, got {len}.")]
    TooFewPoints { len: usize },
    #[error("The grid should be nondecreasing, xs[{index}] breaks the order.")]
    UnsortedGrid { index: usize },
    #[error("The grid should be finite, got xs[{index}] = {value}.")]
    NonFiniteGrid { index: usize, value: f64 },
    #[error("The interval of integration [{start}, {end}] is empty.")]
    EmptyInterval { start: f64, end: f64 },
    #[error("The initial state is empty.")]
    EmptyState,
    /// The output of a fixed-step integration does not fit in memory.
    #[error("Cannot allocate the output for {points} points of dimension {dimension}.")]
    TooManyPoints { points: f64, dimension: usize },
}

/// Checks the initial state and the grid shared by all integrators.
pub(crate) fn validate_problem(y0: &[f64], xs: &[f64]) -> Result<(), IntegrationError> {
    if y0.is_empty() {
        return Err(IntegrationError::EmptyState);
    }
    if xs.len() < 2 {
        return Err(IntegrationError::TooFewPoints { len: xs.len() });
    }
    if let Some(index) = xs.iter().position(|x| !x.is_finite()) {
        return Err(IntegrationError::NonFiniteGrid {
            index,
            value: xs[index],
        });
    }
    for (index, pair) in xs.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(IntegrationError::UnsortedGrid { index: index + 1 });
        }
    }
    let (start, end) = (xs[0], xs[xs.len() - 1]);
    if end <= start {
        return Err(IntegrationError::EmptyInterval { start, end });
    }
    Ok(())
}

/// Contains some statistics of the integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Number of invocations of the derivative function.
    pub num_eval: u32,
    /// Number of steps taken. A step retried after rejections counts once.
    pub num_steps: u32,
    /// Number of rejected trial steps.
    pub rejected_steps: u32,
}

impl Stats {
    pub(crate) fn new() -> Stats {
        Stats::default()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of steps: {}", self.num_steps)?;
        write!(f, "Number of rejected steps: {}", self.rejected_steps)
    }
}

/// Solution of an integration: one row of `dimension` values per output point.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    dimension: usize,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Solution {
    pub(crate) fn new(dimension: usize, xs: Vec<f64>, ys: Vec<f64>) -> Self {
        debug_assert_eq!(xs.len() * dimension, ys.len());
        Self { dimension, xs, ys }
    }

    /// Number of state variables per row.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of output points.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Values of the independent variable, one per row.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// The solution flattened row-major.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// The state at the `i`-th output point.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.ys[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Iterates over the rows in order of increasing `x`.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.ys.chunks_exact(self.dimension)
    }

    /// The last output point and the state there.
    pub fn last(&self) -> Option<(f64, &[f64])> {
        let x = *self.xs.last()?;
        Some((x, self.row(self.xs.len() - 1)))
    }

    /// Copies the solution into a matrix with one row per output point.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.xs.len(), self.dimension, &self.ys)
    }

    /// Returns `(ys, xs)`.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.ys, self.xs)
    }
}
