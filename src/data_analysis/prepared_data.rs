// src/data_analysis/prepared_data.rs

use serde::Serialize;

/// A cleaned sample ready for regression.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PreparedData {
    pub timestamp: f64,
    pub voltage: f64,
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
    /// Cosine of the mechanism angle (arms only, 0.0 otherwise).
    pub cos: f64,
}

/// One named selection of prepared data: the quasistatic (slow ramp) part and
/// the dynamic (step voltage) part.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Dataset {
    pub quasistatic: Vec<PreparedData>,
    pub dynamic: Vec<PreparedData>,
}

impl Dataset {
    pub fn new(quasistatic: Vec<PreparedData>, dynamic: Vec<PreparedData>) -> Self {
        Self { quasistatic, dynamic }
    }

    /// Slot-wise concatenation `self ++ other`, order preserved.
    pub fn concat(&self, other: &Dataset) -> Dataset {
        Dataset {
            quasistatic: concatenate(&self.quasistatic, &other.quasistatic),
            dynamic: concatenate(&self.dynamic, &other.dynamic),
        }
    }

    pub fn len(&self) -> usize {
        self.quasistatic.len() + self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quasistatic.is_empty() && self.dynamic.is_empty()
    }

    /// Every point of the dataset, quasistatic first.
    pub fn iter(&self) -> impl Iterator<Item = &PreparedData> {
        self.quasistatic.iter().chain(self.dynamic.iter())
    }
}

/// Copies `first` followed by `second` into a new vector. Never re-sorted.
pub fn concatenate(first: &[PreparedData], second: &[PreparedData]) -> Vec<PreparedData> {
    let mut dest = Vec::with_capacity(first.len() + second.len());
    dest.extend_from_slice(first);
    dest.extend_from_slice(second);
    dest
}
