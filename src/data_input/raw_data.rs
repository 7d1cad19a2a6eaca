// src/data_input/raw_data.rs

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// One logged instant of a characterization run.
///
/// Stored exactly as recorded: a fixed-width row of 10 values
/// `[time, battery V, speed, primary V, secondary V, primary pos,
/// secondary pos, primary vel, secondary vel, angle]`.
/// For single-motor mechanisms the secondary columns mirror or ignore the primary.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSample(pub [f64; RAW_SAMPLE_WIDTH]);

/// Which motor/encoder pair of a sample to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Primary,   // Left side for drivetrains
    Secondary, // Right side for drivetrains
}

impl RawSample {
    pub fn timestamp(&self) -> f64 {
        self.0[COL_TIMESTAMP]
    }

    pub fn battery_voltage(&self) -> f64 {
        self.0[COL_BATTERY_VOLTAGE]
    }

    pub fn speed(&self) -> f64 {
        self.0[COL_SPEED]
    }

    pub fn angle(&self) -> f64 {
        self.0[COL_ANGLE]
    }

    pub fn voltage(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Primary => self.0[COL_PRIMARY_VOLTAGE],
            Channel::Secondary => self.0[COL_SECONDARY_VOLTAGE],
        }
    }

    pub fn position(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Primary => self.0[COL_PRIMARY_POSITION],
            Channel::Secondary => self.0[COL_SECONDARY_POSITION],
        }
    }

    pub fn velocity(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Primary => self.0[COL_PRIMARY_VELOCITY],
            Channel::Secondary => self.0[COL_SECONDARY_VELOCITY],
        }
    }

    /// Copy of this sample with motor voltages signed like their velocities
    /// and encoder readings scaled from rotations to output units.
    pub fn normalized(&self, units_per_rotation: f64) -> Self {
        let mut row = self.0;
        row[COL_PRIMARY_VOLTAGE] = row[COL_PRIMARY_VOLTAGE].copysign(row[COL_PRIMARY_VELOCITY]);
        row[COL_SECONDARY_VOLTAGE] =
            row[COL_SECONDARY_VOLTAGE].copysign(row[COL_SECONDARY_VELOCITY]);
        for col in [
            COL_PRIMARY_POSITION,
            COL_SECONDARY_POSITION,
            COL_PRIMARY_VELOCITY,
            COL_SECONDARY_VELOCITY,
        ] {
            row[col] *= units_per_rotation;
        }
        RawSample(row)
    }
}

/// Change of a column between the first and last sample of a run.
pub fn column_delta(data: &[RawSample], column: usize) -> Option<f64> {
    let first = data.first()?;
    let last = data.last()?;
    Some(last.0[column] - first.0[column])
}
