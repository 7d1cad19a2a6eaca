// src/data_analysis/track_width.rs

use crate::constants::{
    COL_ANGLE, COL_PRIMARY_POSITION, COL_SECONDARY_POSITION, MIN_TRACKWIDTH_HEADING_RAD, TRACKWIDTH_KEY,
};
use crate::data_input::raw_data::{column_delta, RawSample};
use crate::error::{AnalysisError, Result};

/// Effective track width of a drivetrain spun in place:
/// `(|left| + |right|) / |heading|`.
///
/// `left` and `right` are the distances each side travelled and `heading`
/// the accumulated rotation in radians.
pub fn calculate_track_width(left: f64, right: f64, heading: f64) -> Result<f64> {
    if !(heading.abs() >= MIN_TRACKWIDTH_HEADING_RAD) {
        return Err(AnalysisError::DegenerateTrackWidth { heading_rad: heading });
    }
    Ok((left.abs() + right.abs()) / heading.abs())
}

/// Track width from a recorded in-place rotation run. Wheel distances are
/// scaled by `factor` (units per rotation); the gyro angle is already in radians.
pub fn track_width_from_run(run: &[RawSample], factor: f64) -> Result<f64> {
    let delta = |column: usize| {
        column_delta(run, column).ok_or_else(|| AnalysisError::InsufficientData {
            test: TRACKWIDTH_KEY.to_string(),
            samples: run.len(),
            required: 1,
        })
    };

    let left = delta(COL_PRIMARY_POSITION)? * factor;
    let right = delta(COL_SECONDARY_POSITION)? * factor;
    let heading = delta(COL_ANGLE)?;
    log::debug!("Track width run: left = {:.4}, right = {:.4}, heading = {:.4} rad", left, right, heading);

    calculate_track_width(left, right, heading)
}
