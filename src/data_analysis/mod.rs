// src/data_analysis/mod.rs

pub mod data_preparer;
pub mod feedback;
pub mod feedback_preset;
pub mod feedforward;
pub mod linear_system;
pub mod lqr;
pub mod prepared_data;
pub mod track_width;

// src/data_analysis/mod.rs
