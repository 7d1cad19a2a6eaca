// src/constants.rs

// JSON keys of the four characterization runs, in the order they are prepared.
pub const SLOW_FORWARD_KEY: &str = "slow-forward";
pub const SLOW_BACKWARD_KEY: &str = "slow-backward";
pub const FAST_FORWARD_KEY: &str = "fast-forward";
pub const FAST_BACKWARD_KEY: &str = "fast-backward";
pub const TRACKWIDTH_KEY: &str = "trackwidth";
pub const JSON_DATA_KEYS: [&str; 4] = [
    SLOW_FORWARD_KEY,
    SLOW_BACKWARD_KEY,
    FAST_FORWARD_KEY,
    FAST_BACKWARD_KEY,
];

// Column layout of a raw sample row.
pub const RAW_SAMPLE_WIDTH: usize = 10;
pub const COL_TIMESTAMP: usize = 0;
pub const COL_BATTERY_VOLTAGE: usize = 1;
pub const COL_SPEED: usize = 2;
pub const COL_PRIMARY_VOLTAGE: usize = 3;
pub const COL_SECONDARY_VOLTAGE: usize = 4;
pub const COL_PRIMARY_POSITION: usize = 5;
pub const COL_SECONDARY_POSITION: usize = 6;
pub const COL_PRIMARY_VELOCITY: usize = 7;
pub const COL_SECONDARY_VELOCITY: usize = 8;
pub const COL_ANGLE: usize = 9;

// Data preparation defaults.
pub const DEFAULT_WINDOW_SIZE: usize = 8; // Samples spanned by the central difference
pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.1; // units/s
pub const DEFAULT_STEP_TRIM_CAUTION: usize = 3; // Consecutive decreasing samples that confirm the peak

// Dataset names. Drivetrain files additionally get the prefixed variants.
pub const DATASET_FORWARD: &str = "Forward";
pub const DATASET_BACKWARD: &str = "Backward";
pub const DATASET_COMBINED: &str = "Combined";
pub const DATASET_NAMES: [&str; 3] = [DATASET_COMBINED, DATASET_FORWARD, DATASET_BACKWARD];
pub const DRIVETRAIN_DATASET_NAMES: [&str; 9] = [
    DATASET_COMBINED,
    DATASET_FORWARD,
    DATASET_BACKWARD,
    "Left Combined",
    "Left Forward",
    "Left Backward",
    "Right Combined",
    "Right Forward",
    "Right Backward",
];

// Feedback synthesis.
pub const KA_NEGLIGIBLE_THRESHOLD: f64 = 1e-7; // V/(units/s^2)
pub const DEFAULT_MAX_POSITION_ERROR: f64 = 1.0; // units
pub const DEFAULT_MAX_VELOCITY_ERROR: f64 = 1.5; // units/s
pub const DEFAULT_MAX_CONTROL_EFFORT: f64 = 7.0; // V

// Riccati doubling iteration limits.
pub const DARE_MAX_ITERATIONS: usize = 100;
pub const DARE_TOLERANCE: f64 = 1e-12;

// Fit quality below this R^2 is reported as a warning.
pub const R_SQUARED_WARNING_THRESHOLD: f64 = 0.9;

// Heading change below this (radians) cannot yield a track width.
pub const MIN_TRACKWIDTH_HEADING_RAD: f64 = 1e-9;

// src/constants.rs
