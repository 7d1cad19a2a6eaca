// src/settings.rs

use crate::constants::*;
use crate::data_analysis::feedback::{FeedbackLoopType, LqrParameters};
use crate::data_analysis::feedback_preset::FeedbackControllerPreset;
use crate::error::{AnalysisError, Result};

/// Snapshot of every user-tunable analysis parameter.
///
/// The manager owns one of these and replaces it wholesale on change,
/// so computations always see a consistent set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Quasistatic samples at or below this speed (units/s) are dropped.
    pub motion_threshold: f64,
    /// Span of the central-difference acceleration estimate, in samples. Must be even.
    pub window_size: usize,
    /// Consecutive decreasing-acceleration samples that confirm the step-voltage peak.
    pub step_trim_caution: usize,
    /// Name of the dataset used for gain calculation.
    pub dataset: String,
    pub loop_type: FeedbackLoopType,
    pub preset: FeedbackControllerPreset,
    pub lqr: LqrParameters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
            step_trim_caution: DEFAULT_STEP_TRIM_CAUTION,
            dataset: DATASET_COMBINED.to_string(),
            loop_type: FeedbackLoopType::Velocity,
            preset: FeedbackControllerPreset::default(),
            lqr: LqrParameters::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 || self.window_size % 2 != 0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "window size must be an even number >= 2, got {}",
                self.window_size
            )));
        }
        if !self.motion_threshold.is_finite() || self.motion_threshold < 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "motion threshold must be non-negative, got {}",
                self.motion_threshold
            )));
        }
        if self.step_trim_caution == 0 {
            return Err(AnalysisError::InvalidParameter(
                "step trim caution window must be at least 1 sample".to_string(),
            ));
        }
        self.preset.validate()?;
        self.lqr.validate()
    }
}
