// src/data_analysis/lqr.rs
//
// Discrete-time linear-quadratic regulator design with latency compensation.

use nalgebra::DMatrix;
use num_complex::Complex;

use crate::constants::{DARE_MAX_ITERATIONS, DARE_TOLERANCE};
use crate::data_analysis::linear_system::LinearSystem;
use crate::error::{AnalysisError, Result};

/// Optimal state-feedback gain `u = -K x` for a discretized plant.
#[derive(Debug, Clone)]
pub struct LinearQuadraticRegulator {
    k: DMatrix<f64>,
    disc_a: DMatrix<f64>,
    disc_b: DMatrix<f64>,
    dt: f64,
}

/// Diagonal cost matrix from maximum allowed excursions (Bryson's rule):
/// each entry is `1 / tolerance^2`.
pub fn bryson_cost_matrix(tolerances: &[f64]) -> Result<DMatrix<f64>> {
    if let Some(bad) = tolerances.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        return Err(AnalysisError::InvalidParameter(format!(
            "LQR tolerances must be positive and finite, got {}",
            bad
        )));
    }
    let diagonal: Vec<f64> = tolerances.iter().map(|t| 1.0 / (t * t)).collect();
    Ok(DMatrix::from_diagonal(&nalgebra::DVector::from_vec(diagonal)))
}

impl LinearQuadraticRegulator {
    /// Designs the regulator from state and input tolerances.
    pub fn new(system: &LinearSystem, q_tolerances: &[f64], r_tolerances: &[f64], dt: f64) -> Result<Self> {
        if q_tolerances.len() != system.states() || r_tolerances.len() != system.inputs() {
            return Err(AnalysisError::Synthesis(format!(
                "expected {} state and {} input tolerances, got {} and {}",
                system.states(),
                system.inputs(),
                q_tolerances.len(),
                r_tolerances.len()
            )));
        }
        let q = bryson_cost_matrix(q_tolerances)?;
        let r = bryson_cost_matrix(r_tolerances)?;
        Self::from_weights(system, &q, &r, dt)
    }

    /// Designs the regulator from explicit cost matrices.
    pub fn from_weights(system: &LinearSystem, q: &DMatrix<f64>, r: &DMatrix<f64>, dt: f64) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(AnalysisError::InvalidParameter(format!("period must be positive, got {}", dt)));
        }

        let (disc_a, disc_b) = system.discretize_ab(dt);
        let p = solve_dare(&disc_a, &disc_b, q, r)?;

        let bt_p = disc_b.transpose() * &p;
        let k = (r + &bt_p * &disc_b)
            .lu()
            .solve(&(&bt_p * &disc_a))
            .ok_or_else(|| AnalysisError::Synthesis("singular matrix while computing LQR gain".to_string()))?;

        if k.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Synthesis("LQR gain is not finite".to_string()));
        }

        Ok(Self { k, disc_a, disc_b, dt })
    }

    /// Adjusts the gain for a measurement delay: `K (A - B K)^(delay / dt)`.
    ///
    /// The controller acts on a state that is `delay` seconds old; propagating
    /// it through the closed loop discounts the gain. Zero delay leaves K unchanged.
    pub fn latency_compensate(&mut self, input_delay: f64) -> Result<()> {
        if !(input_delay.is_finite() && input_delay >= 0.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "measurement delay must be non-negative, got {}",
                input_delay
            )));
        }
        if input_delay == 0.0 {
            return Ok(());
        }

        let closed_loop = &self.disc_a - &self.disc_b * &self.k;
        let propagation = fractional_matrix_power(&closed_loop, input_delay / self.dt)?;
        let compensated = &self.k * propagation;

        if compensated.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::Synthesis("latency-compensated gain is not finite".to_string()));
        }
        self.k = compensated;
        Ok(())
    }

    /// Gain matrix, one row per input and one column per state.
    pub fn k(&self) -> &DMatrix<f64> {
        &self.k
    }
}

/// Solves the discrete algebraic Riccati equation
/// `P = AᵀPA − AᵀPB (R + BᵀPB)⁻¹ BᵀPA + Q` with the structure-preserving
/// doubling algorithm.
pub fn solve_dare(a: &DMatrix<f64>, b: &DMatrix<f64>, q: &DMatrix<f64>, r: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let n = a.nrows();
    let identity = DMatrix::<f64>::identity(n, n);
    let r_inv = r
        .clone()
        .try_inverse()
        .ok_or_else(|| AnalysisError::Synthesis("input cost matrix R is singular".to_string()))?;

    let mut a_k = a.clone();
    let mut g_k = b * r_inv * b.transpose();
    let mut h_k = q.clone();

    for _ in 0..DARE_MAX_ITERATIONS {
        let w = (&identity + &g_k * &h_k)
            .try_inverse()
            .ok_or_else(|| AnalysisError::Synthesis("Riccati iteration became singular".to_string()))?;

        let a_w = &a_k * &w;
        let a_next = &a_w * &a_k;
        let g_next = &g_k + &a_w * &g_k * a_k.transpose();
        let h_next = &h_k + a_k.transpose() * &h_k * &w * &a_k;

        let change = (&h_next - &h_k).norm();
        let scale = h_next.norm().max(f64::MIN_POSITIVE);

        a_k = a_next;
        g_k = g_next;
        h_k = h_next;

        if !h_k.iter().all(|v| v.is_finite()) {
            return Err(AnalysisError::Synthesis("Riccati solution diverged".to_string()));
        }
        if change <= DARE_TOLERANCE * scale {
            // Symmetrize to remove round-off asymmetry.
            return Ok((&h_k + h_k.transpose()) * 0.5);
        }
    }

    Err(AnalysisError::Synthesis(format!(
        "Riccati equation did not converge in {} iterations",
        DARE_MAX_ITERATIONS
    )))
}

/// Real part of the principal power `m^exponent` for 1x1 and 2x2 matrices.
///
/// 2x2 matrices use Sylvester's formula over the (possibly complex) eigenvalues.
pub fn fractional_matrix_power(m: &DMatrix<f64>, exponent: f64) -> Result<DMatrix<f64>> {
    if !m.is_square() {
        return Err(AnalysisError::Synthesis("matrix power needs a square matrix".to_string()));
    }
    if exponent == 0.0 {
        return Ok(DMatrix::identity(m.nrows(), m.ncols()));
    }

    match m.nrows() {
        1 => {
            let value = Complex::new(m[(0, 0)], 0.0).powf(exponent).re;
            Ok(DMatrix::from_element(1, 1, value))
        }
        2 => {
            let trace = m[(0, 0)] + m[(1, 1)];
            let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
            let half_trace = Complex::new(trace / 2.0, 0.0);
            let root = Complex::new(trace * trace / 4.0 - det, 0.0).sqrt();
            let l1 = half_trace + root;
            let l2 = half_trace - root;

            let mc = m.map(|v| Complex::new(v, 0.0));
            let id = DMatrix::<Complex<f64>>::identity(2, 2);
            let scale = l1.norm().max(l2.norm()).max(f64::MIN_POSITIVE);

            let result = if (l1 - l2).norm() > 1e-6 * scale {
                let term1 = (&mc - &id * l2) * (l1.powf(exponent) / (l1 - l2));
                let term2 = (&mc - &id * l1) * (l2.powf(exponent) / (l2 - l1));
                term1 + term2
            } else {
                // Repeated eigenvalue: M = λI + N with N nilpotent.
                let lambda = half_trace;
                if lambda.norm() < f64::MIN_POSITIVE {
                    return Err(AnalysisError::Synthesis(
                        "fractional power of a nilpotent matrix is undefined".to_string(),
                    ));
                }
                let nilpotent = &mc - &id * lambda;
                &id * lambda.powf(exponent) + nilpotent * (lambda.powf(exponent - 1.0) * exponent)
            };

            Ok(result.map(|c| c.re))
        }
        n => Err(AnalysisError::Synthesis(format!(
            "latency compensation supports at most 2 states, got {}",
            n
        ))),
    }
}
