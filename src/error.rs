// src/error.rs

use thiserror::Error;

/// Errors produced while loading characterization data or computing gains.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Missing or malformed keys in the input document.
    #[error("File format error: {0}")]
    FileFormat(String),

    #[error("Unknown analysis type: '{0}' (expected Drivetrain, Elevator, Arm or Simple)")]
    UnknownAnalysisType(String),

    /// Fewer samples than the acceleration window spans.
    #[error("Insufficient data in '{test}': {samples} samples, need at least {required}")]
    InsufficientData {
        test: String,
        samples: usize,
        required: usize,
    },

    /// The regression produced no finite coefficients.
    #[error("Ill-conditioned feedforward fit: {0}")]
    IllConditionedFit(String),

    #[error("Heading change of {heading_rad:e} rad is too small to estimate a track width")]
    DegenerateTrackWidth { heading_rad: f64 },

    #[error("Unknown dataset: '{0}'")]
    UnknownDataset(String),

    #[error("Unknown feedback preset: '{0}'")]
    UnknownPreset(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// LQR design failed (singular matrices, non-finite gains).
    #[error("Feedback synthesis failed: {0}")]
    Synthesis(String),
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::FileFormat(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
