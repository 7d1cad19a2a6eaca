// src/types.rs
// Type aliases shared across the analysis modules

use std::collections::BTreeMap;

use crate::data_analysis::prepared_data::Dataset;

// Named datasets of one loaded file ("Combined", "Left Forward", ...).
pub type DatasetMap = BTreeMap<String, Dataset>;

// (Kp, Kd) as returned by the feedback synthesizer.
pub type KpKd = (f64, f64);
