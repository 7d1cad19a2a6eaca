// src/data_analysis/feedback_preset.rs

use crate::error::{AnalysisError, Result};

/// Timing and output-unit conventions of the motor controller that will run the loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackControllerPreset {
    /// Controller output units per volt (e.g. 1023/12 for a 10-bit duty cycle).
    pub output_conversion_factor: f64,
    /// Time base of the controller's velocity units in seconds (0.1 for "per 100 ms").
    pub output_velocity_time_factor: f64,
    /// Loop period in seconds.
    pub period: f64,
    /// Delay between a position change and the controller seeing it, in seconds.
    pub position_measurement_delay: f64,
    /// Delay of the (typically filtered) velocity measurement, in seconds.
    pub velocity_measurement_delay: f64,
}

impl FeedbackControllerPreset {
    pub const fn new(
        output_conversion_factor: f64,
        output_velocity_time_factor: f64,
        period: f64,
        position_measurement_delay: f64,
        velocity_measurement_delay: f64,
    ) -> Self {
        Self {
            output_conversion_factor,
            output_velocity_time_factor,
            period,
            position_measurement_delay,
            velocity_measurement_delay,
        }
    }

    /// Looks up a preset by its display name.
    pub fn by_name(name: &str) -> Result<Self> {
        FEEDBACK_PRESETS
            .iter()
            .find(|(preset_name, _)| *preset_name == name)
            .map(|(_, preset)| *preset)
            .ok_or_else(|| AnalysisError::UnknownPreset(name.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.period.is_finite() || self.period <= 0.0 {
            return Err(AnalysisError::InvalidParameter(format!(
                "preset period must be positive, got {}",
                self.period
            )));
        }
        if !(self.position_measurement_delay >= 0.0 && self.velocity_measurement_delay >= 0.0) {
            return Err(AnalysisError::InvalidParameter(
                "measurement delays must be non-negative".to_string(),
            ));
        }
        if self.output_velocity_time_factor == 0.0 || !self.output_velocity_time_factor.is_finite() {
            return Err(AnalysisError::InvalidParameter(
                "output velocity time factor must be finite and non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FeedbackControllerPreset {
    fn default() -> Self {
        PRESET_DEFAULT
    }
}

pub const PRESET_DEFAULT: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1.0, 1.0, 0.020, 0.0, 0.0);
pub const PRESET_WPILIB_NEW: FeedbackControllerPreset = PRESET_DEFAULT;
pub const PRESET_WPILIB_OLD: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1.0 / 12.0, 1.0, 0.050, 0.0, 0.0);
// Talon firmware averages velocity over a 100 ms window.
pub const PRESET_CTRE_NEW: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1023.0 / 12.0, 0.1, 0.001, 0.0, 0.0815);
pub const PRESET_CTRE_OLD: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1023.0 / 12.0, 0.1, 0.001, 0.0, 0.1);
pub const PRESET_REV_BRUSHLESS: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1.0 / 12.0, 60.0, 0.001, 0.0, 0.032);
pub const PRESET_REV_BRUSHED: FeedbackControllerPreset =
    FeedbackControllerPreset::new(1.0 / 12.0, 60.0, 0.001, 0.0, 0.0);

/// Named presets offered to the user, in display order.
pub const FEEDBACK_PRESETS: [(&str, FeedbackControllerPreset); 7] = [
    ("Default", PRESET_DEFAULT),
    ("WPILib (2020-)", PRESET_WPILIB_NEW),
    ("WPILib (Pre-2020)", PRESET_WPILIB_OLD),
    ("CTRE (New)", PRESET_CTRE_NEW),
    ("CTRE (Old)", PRESET_CTRE_OLD),
    ("REV (Brushless)", PRESET_REV_BRUSHLESS),
    ("REV (Brushed)", PRESET_REV_BRUSHED),
];
