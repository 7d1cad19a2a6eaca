// src/data_analysis/feedback.rs
//
// Feedback gain synthesis: LQR on the identified plant, latency
// compensation, then conversion into the controller's output units.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::constants::{
    DEFAULT_MAX_CONTROL_EFFORT, DEFAULT_MAX_POSITION_ERROR, DEFAULT_MAX_VELOCITY_ERROR, KA_NEGLIGIBLE_THRESHOLD,
};
use crate::data_analysis::feedback_preset::FeedbackControllerPreset;
use crate::data_analysis::feedforward::FeedforwardGains;
use crate::data_analysis::linear_system::LinearSystem;
use crate::data_analysis::lqr::LinearQuadraticRegulator;
use crate::error::{AnalysisError, Result};
use crate::types::KpKd;

/// Which quantity the feedback loop regulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeedbackLoopType {
    Position,
    Velocity,
}

impl fmt::Display for FeedbackLoopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackLoopType::Position => write!(f, "position"),
            FeedbackLoopType::Velocity => write!(f, "velocity"),
        }
    }
}

impl FromStr for FeedbackLoopType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "position" => Ok(FeedbackLoopType::Position),
            "velocity" => Ok(FeedbackLoopType::Velocity),
            other => Err(format!("unknown loop type '{}' (expected position or velocity)", other)),
        }
    }
}

/// Maximum tolerated excursions used to weight the LQR cost (Bryson's rule).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LqrParameters {
    /// Maximum position error, in analysis units.
    pub qp: f64,
    /// Maximum velocity error, in analysis units per second.
    pub qv: f64,
    /// Maximum control effort, in volts.
    pub r: f64,
}

impl Default for LqrParameters {
    fn default() -> Self {
        Self {
            qp: DEFAULT_MAX_POSITION_ERROR,
            qv: DEFAULT_MAX_VELOCITY_ERROR,
            r: DEFAULT_MAX_CONTROL_EFFORT,
        }
    }
}

impl LqrParameters {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("qp", self.qp), ("qv", self.qv), ("r", self.r)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::InvalidParameter(format!(
                    "LQR parameter {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Position-loop gains.
///
/// With a non-negligible Ka the plant has position and velocity states.
/// Otherwise velocity is treated as the input of a pure integrator and the
/// resulting gain is scaled by Kv to map it back to volts; Kd is zero.
pub fn calculate_position_feedback_gains(
    preset: &FeedbackControllerPreset,
    params: &LqrParameters,
    feedforward: &FeedforwardGains,
) -> Result<KpKd> {
    let (kv, ka) = (feedforward.kv(), feedforward.ka());

    let (kp, kd) = if ka > KA_NEGLIGIBLE_THRESHOLD {
        let system = LinearSystem::identify_position_system(kv, ka)?;
        let mut controller =
            LinearQuadraticRegulator::new(&system, &[params.qp, params.qv], &[params.r], preset.period)?;
        controller.latency_compensate(preset.position_measurement_delay)?;
        let k = controller.k();
        (k[(0, 0)], k[(0, 1)])
    } else {
        log::debug!("Ka = {:.3e} is negligible; using the integrator position model", ka);
        let system = LinearSystem::integrator();
        let mut controller = LinearQuadraticRegulator::new(&system, &[params.qp], &[params.r], preset.period)?;
        controller.latency_compensate(preset.position_measurement_delay)?;
        (kv * controller.k()[(0, 0)], 0.0)
    };

    Ok((
        kp * preset.output_conversion_factor,
        kd * preset.output_conversion_factor / preset.output_velocity_time_factor,
    ))
}

/// Velocity-loop gains. Returns exactly `(0, 0)` when Ka is negligible,
/// since acceleration then costs no effort and the LQR gain vanishes.
pub fn calculate_velocity_feedback_gains(
    preset: &FeedbackControllerPreset,
    params: &LqrParameters,
    feedforward: &FeedforwardGains,
) -> Result<KpKd> {
    let (kv, ka) = (feedforward.kv(), feedforward.ka());
    if ka < KA_NEGLIGIBLE_THRESHOLD {
        return Ok((0.0, 0.0));
    }

    let system = LinearSystem::identify_velocity_system(kv, ka)?;
    let mut controller = LinearQuadraticRegulator::new(&system, &[params.qv], &[params.r], preset.period)?;
    controller.latency_compensate(preset.velocity_measurement_delay)?;
    let kp = controller.k()[(0, 0)];

    Ok((kp * preset.output_conversion_factor / preset.output_velocity_time_factor, 0.0))
}

pub fn calculate_feedback_gains(
    preset: &FeedbackControllerPreset,
    params: &LqrParameters,
    feedforward: &FeedforwardGains,
    loop_type: FeedbackLoopType,
) -> Result<KpKd> {
    match loop_type {
        FeedbackLoopType::Position => calculate_position_feedback_gains(preset, params, feedforward),
        FeedbackLoopType::Velocity => calculate_velocity_feedback_gains(preset, params, feedforward),
    }
}
