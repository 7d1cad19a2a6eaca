// src/data_analysis/linear_system.rs
//
// Continuous-time state-space plant models identified from feedforward gains.

use nalgebra::DMatrix;

use crate::error::{AnalysisError, Result};

/// Continuous-time linear system `dx/dt = A x + B u` with full state feedback.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub a: DMatrix<f64>,
    pub b: DMatrix<f64>,
}

impl LinearSystem {
    pub fn new(a: DMatrix<f64>, b: DMatrix<f64>) -> Result<Self> {
        let states = a.nrows();
        if a.ncols() != states || b.nrows() != states {
            return Err(AnalysisError::Synthesis(format!(
                "inconsistent system dimensions: A {}x{}, B {}x{}",
                a.nrows(),
                a.ncols(),
                b.nrows(),
                b.ncols()
            )));
        }
        Ok(Self { a, b })
    }

    pub fn states(&self) -> usize {
        self.a.nrows()
    }

    pub fn inputs(&self) -> usize {
        self.b.ncols()
    }

    /// Velocity plant `dv/dt = -Kv/Ka v + 1/Ka u`.
    pub fn identify_velocity_system(kv: f64, ka: f64) -> Result<Self> {
        check_gains(kv, ka)?;
        Self::new(
            DMatrix::from_element(1, 1, -kv / ka),
            DMatrix::from_element(1, 1, 1.0 / ka),
        )
    }

    /// Position plant with states `[position, velocity]`.
    pub fn identify_position_system(kv: f64, ka: f64) -> Result<Self> {
        check_gains(kv, ka)?;
        Self::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, -kv / ka]),
            DMatrix::from_row_slice(2, 1, &[0.0, 1.0 / ka]),
        )
    }

    /// Pure integrator `dx/dt = u`, used when acceleration needs no effort
    /// and velocity acts directly as the input.
    pub fn integrator() -> Self {
        Self {
            a: DMatrix::zeros(1, 1),
            b: DMatrix::from_element(1, 1, 1.0),
        }
    }

    /// Zero-order-hold discretization of (A, B) with sample period `dt`.
    pub fn discretize_ab(&self, dt: f64) -> (DMatrix<f64>, DMatrix<f64>) {
        discretize_ab(&self.a, &self.b, dt)
    }
}

fn check_gains(kv: f64, ka: f64) -> Result<()> {
    if !kv.is_finite() || !ka.is_finite() || ka <= 0.0 {
        return Err(AnalysisError::Synthesis(format!(
            "cannot identify a plant from Kv = {}, Ka = {}",
            kv, ka
        )));
    }
    Ok(())
}

/// Exact zero-order-hold discretization through the matrix exponential of
/// the augmented matrix `[[A, B], [0, 0]] * dt`.
pub fn discretize_ab(a: &DMatrix<f64>, b: &DMatrix<f64>, dt: f64) -> (DMatrix<f64>, DMatrix<f64>) {
    let states = a.nrows();
    let inputs = b.ncols();

    let mut m = DMatrix::<f64>::zeros(states + inputs, states + inputs);
    m.view_mut((0, 0), (states, states)).copy_from(&(a * dt));
    m.view_mut((0, states), (states, inputs)).copy_from(&(b * dt));

    let phi = m.exp();
    let disc_a = phi.view((0, 0), (states, states)).into_owned();
    let disc_b = phi.view((0, states), (states, inputs)).into_owned();
    (disc_a, disc_b)
}
