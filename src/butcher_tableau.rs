//! Coefficient tables of the Runge-Kutta methods.

/// Dormand-Prince 5(4) pair with its quartic continuous extension.
///
/// Stages are indexed from zero. The last stage is evaluated at the accepted
/// solution, so it doubles as the first stage of the next step.
pub mod dopri54 {
    /// Number of stages, including the one reused by the next step.
    pub const STAGES: usize = 7;

    /// Nodes.
    pub const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

    /// Runge-Kutta matrix. Row `s` combines stages `0..s` into the input of stage `s`.
    /// The last row equals the fifth-order weights.
    pub const A: [[f64; STAGES - 1]; STAGES] = [
        [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
        [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
        [
            19372.0 / 6561.0,
            -25360.0 / 2187.0,
            64448.0 / 6561.0,
            -212.0 / 729.0,
            0.0,
            0.0,
        ],
        [
            9017.0 / 3168.0,
            -355.0 / 33.0,
            46732.0 / 5247.0,
            49.0 / 176.0,
            -5103.0 / 18656.0,
            0.0,
        ],
        [
            35.0 / 384.0,
            0.0,
            500.0 / 1113.0,
            125.0 / 192.0,
            -2187.0 / 6784.0,
            11.0 / 84.0,
        ],
    ];

    /// Difference between the fifth- and the fourth-order weights.
    pub const E: [f64; STAGES] = [
        71.0 / 57600.0,
        0.0,
        -71.0 / 16695.0,
        71.0 / 1920.0,
        -17253.0 / 339200.0,
        22.0 / 525.0,
        -1.0 / 40.0,
    ];

    /// Dense output. Row `p` holds the weights of `s^(p + 1)`, where `s` is the
    /// position inside the step normalized to `[0, 1]`.
    pub const DENSE: [[f64; STAGES]; 4] = [
        [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        [
            -183.0 / 64.0,
            0.0,
            1500.0 / 371.0,
            -125.0 / 32.0,
            9477.0 / 3392.0,
            -11.0 / 7.0,
            3.0 / 2.0,
        ],
        [
            37.0 / 12.0,
            0.0,
            -1000.0 / 159.0,
            125.0 / 12.0,
            -729.0 / 106.0,
            11.0 / 3.0,
            -4.0,
        ],
        [
            -145.0 / 128.0,
            0.0,
            1000.0 / 371.0,
            -375.0 / 64.0,
            25515.0 / 6784.0,
            -55.0 / 28.0,
            5.0 / 2.0,
        ],
    ];
}

#[cfg(test)]
mod tests {
    use super::dopri54::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rows_sum_to_nodes() {
        for s in 0..STAGES {
            let sum: f64 = A[s].iter().sum();
            assert_relative_eq!(sum, C[s], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_error_weights_sum_to_zero() {
        let sum: f64 = E.iter().sum();
        assert_relative_eq!(sum, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_dense_output_ends_on_solution() {
        // At s = 1 the interpolant reproduces the fifth-order solution.
        for j in 0..STAGES {
            let weight: f64 = DENSE.iter().map(|row| row[j]).sum();
            let expected = if j < STAGES - 1 { A[STAGES - 1][j] } else { 0.0 };
            assert_relative_eq!(weight, expected, epsilon = 1e-13);
        }
    }
}
