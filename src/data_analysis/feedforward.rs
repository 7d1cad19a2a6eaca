// src/data_analysis/feedforward.rs
//
// Ordinary least-squares fit of the voltage model
//   V = Ks*sgn(v) + Kv*v + Ka*a (+ Kg | + Kcos*cos(theta))
// over the quasistatic and dynamic points of a dataset.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::analysis_type::AnalysisType;
use crate::constants::R_SQUARED_WARNING_THRESHOLD;
use crate::data_analysis::prepared_data::{Dataset, PreparedData};
use crate::error::{AnalysisError, Result};

// Singular values below this fraction of the largest are treated as zero.
const SVD_RELATIVE_EPS: f64 = 1e-12;

/// Fitted feedforward coefficients and fit quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedforwardGains {
    /// `[Ks, Kv, Ka]` plus `Kg` (elevator) or `Kcos` (arm).
    pub coefficients: Vec<f64>,
    /// Coefficient of determination. NaN when the voltage has no variance.
    pub r_squared: f64,
    /// Root-mean-square voltage residual.
    pub rmse: f64,
}

impl FeedforwardGains {
    pub fn ks(&self) -> f64 {
        self.coefficients[0]
    }

    pub fn kv(&self) -> f64 {
        self.coefficients[1]
    }

    pub fn ka(&self) -> f64 {
        self.coefficients[2]
    }

    /// Kg for elevators, Kcos for arms.
    pub fn gravity(&self) -> Option<f64> {
        self.coefficients.get(3).copied()
    }

    /// Fits below the warning threshold, or with undefined R², are suspect.
    pub fn is_poor_fit(&self) -> bool {
        !(self.r_squared >= R_SQUARED_WARNING_THRESHOLD)
    }
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Builds the regression design matrix (one row per point) and the voltage response.
pub fn build_regression(dataset: &Dataset, analysis_type: AnalysisType) -> (Array2<f64>, Array1<f64>) {
    let columns = analysis_type.independent_variables();
    let points: Vec<&PreparedData> = dataset.iter().collect();

    let mut x = Array2::<f64>::zeros((points.len(), columns));
    let mut y = Array1::<f64>::zeros(points.len());

    for (row, pt) in points.iter().enumerate() {
        x[[row, 0]] = sign(pt.velocity);
        x[[row, 1]] = pt.velocity;
        x[[row, 2]] = pt.acceleration;
        match analysis_type {
            AnalysisType::Elevator => x[[row, 3]] = 1.0,
            AnalysisType::Arm => x[[row, 3]] = pt.cos,
            AnalysisType::Drivetrain | AnalysisType::Simple => {}
        }
        y[row] = pt.voltage;
    }

    (x, y)
}

/// Least-squares solution of `x * beta = y` through an SVD, so rank-deficient
/// designs return the minimum-norm solution instead of failing.
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Result<Array1<f64>> {
    let (rows, cols) = x.dim();
    let a = DMatrix::from_fn(rows, cols, |r, c| x[[r, c]]);
    let b = DVector::from_iterator(rows, y.iter().copied());

    let svd = a.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if max_sv <= 0.0 || min_sv / max_sv < 1e-10 {
        log::warn!(
            "Feedforward design matrix is near-singular (singular values {:.3e}..{:.3e}); \
             coefficients may be unreliable",
            min_sv,
            max_sv
        );
    }

    let beta = svd
        .solve(&b, SVD_RELATIVE_EPS * max_sv.max(f64::MIN_POSITIVE))
        .map_err(|e| AnalysisError::IllConditionedFit(e.to_string()))?;

    Ok(beta.iter().copied().collect())
}

/// Coefficient of determination and RMSE of a fitted model.
pub fn fit_quality(x: &Array2<f64>, y: &Array1<f64>, beta: &Array1<f64>) -> (f64, f64) {
    let n = y.len() as f64;
    let predicted = x.dot(beta);
    let residuals = y - &predicted;
    let ss_res = residuals.mapv(|r| r * r).sum();

    let mean = y.sum() / n;
    let ss_tot = y.mapv(|v| (v - mean).powi(2)).sum();

    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { f64::NAN };
    let rmse = (ss_res / n).sqrt();
    (r_squared, rmse)
}

/// Fits feedforward gains to the quasistatic and dynamic points of `dataset`.
pub fn calculate_feedforward_gains(dataset: &Dataset, analysis_type: AnalysisType) -> Result<FeedforwardGains> {
    let columns = analysis_type.independent_variables();
    if dataset.len() < columns {
        return Err(AnalysisError::InsufficientData {
            test: "feedforward regression".to_string(),
            samples: dataset.len(),
            required: columns,
        });
    }

    let (x, y) = build_regression(dataset, analysis_type);
    let beta = solve_least_squares(&x, &y)?;

    if beta.iter().any(|c| !c.is_finite()) {
        return Err(AnalysisError::IllConditionedFit(
            "regression produced non-finite coefficients".to_string(),
        ));
    }

    let (r_squared, rmse) = fit_quality(&x, &y, &beta);
    let gains = FeedforwardGains { coefficients: beta.to_vec(), r_squared, rmse };

    if gains.is_poor_fit() {
        log::warn!(
            "Poor feedforward fit (r^2 = {:.4}, rmse = {:.4} V); check the recorded data",
            r_squared,
            rmse
        );
    }

    Ok(gains)
}
