//! # Dopri
//! `dopri` integrates initial-value problems `dy/dx = f(x, y)` with the adaptive
//! Dormand-Prince 5(4) method. Solutions can be requested on a caller-chosen grid,
//! which is filled by dense output, or on the points the step-size control picks.
//! A fixed-step classical Runge-Kutta 4 integrator is provided for comparison.

// Re-export from external crate
pub use nalgebra::DMatrix;

// Declare modules
pub mod butcher_tableau;
pub mod constants;
pub mod controller;
pub mod dense_output;
pub mod dop_shared;
pub mod dopri5;
pub mod output;
pub mod rk4;

pub use dopri5::Dopri5;
pub use rk4::Rk4;

pub use dop_shared::{ConfigError, IntegrationError, Integrator, Solution, Stats, System};
