//! Continuous extension of the Dormand-Prince method.

use crate::butcher_tableau::dopri54::{DENSE, STAGES};

/// Evaluates the solution at `x_next` inside the step `[x, x + h]` without
/// calling the derivative function.
///
/// # Arguments
///
/// * `x`       - Start of the step
/// * `y`       - State at the start of the step
/// * `k`       - Stage derivatives of the step, stored stage after stage
/// * `h`       - Size of the step
/// * `x_next`  - Point of evaluation, `x <= x_next <= x + h`
/// * `y_next`  - Output buffer
///
pub fn interpolate(x: f64, y: &[f64], k: &[f64], h: f64, x_next: f64, y_next: &mut [f64]) {
    let nd = y.len();
    debug_assert_eq!(k.len(), STAGES * nd);
    debug_assert_eq!(y_next.len(), nd);

    let s1 = (x_next - x) / h;
    let s2 = s1 * s1;
    let s3 = s1 * s2;
    let s4 = s1 * s3;
    let powers = [h * s1, h * s2, h * s3, h * s4];

    for i in 0..nd {
        let mut value = y[i];
        for (weights, power) in DENSE.iter().zip(powers) {
            let mut sum = 0.0;
            for (j, weight) in weights.iter().enumerate() {
                sum += weight * k[j * nd + i];
            }
            value += power * sum;
        }
        y_next[i] = value;
    }
}
