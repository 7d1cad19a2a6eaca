// src/data_input/sysid_json.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::analysis_type::AnalysisType;
use crate::constants::*;
use crate::data_input::raw_data::RawSample;
use crate::error::{AnalysisError, Result};

/// Raw runs keyed by test name ("slow-forward", ...).
pub type RawRuns = BTreeMap<String, Vec<RawSample>>;

/// A recorded characterization file as produced by the telemetry logger.
///
/// Unknown keys are ignored so files carrying extra logger metadata still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SysIdDocument {
    /// Mechanism kind: "Drivetrain", "Elevator", "Arm" or "Simple".
    pub test: String,
    /// Label of the output units ("Meters", "Degrees", ...).
    pub units: String,
    #[serde(rename = "unitsPerRotation")]
    pub units_per_rotation: f64,
    #[serde(rename = "slow-forward")]
    pub slow_forward: Vec<RawSample>,
    #[serde(rename = "slow-backward")]
    pub slow_backward: Vec<RawSample>,
    #[serde(rename = "fast-forward")]
    pub fast_forward: Vec<RawSample>,
    #[serde(rename = "fast-backward")]
    pub fast_backward: Vec<RawSample>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trackwidth: Option<Vec<RawSample>>,
}

impl SysIdDocument {
    /// Resolved mechanism kind of the `test` field.
    pub fn analysis_type(&self) -> Result<AnalysisType> {
        AnalysisType::from_name(&self.test)
    }

    /// The four characterization runs keyed by their JSON names.
    pub fn raw_runs(&self) -> RawRuns {
        let runs = [&self.slow_forward, &self.slow_backward, &self.fast_forward, &self.fast_backward];
        JSON_DATA_KEYS
            .iter()
            .zip(runs)
            .map(|(key, run)| (key.to_string(), run.clone()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if !self.units_per_rotation.is_finite() || self.units_per_rotation == 0.0 {
            return Err(AnalysisError::FileFormat(format!(
                "'unitsPerRotation' must be a finite non-zero number, got {}",
                self.units_per_rotation
            )));
        }
        Ok(())
    }
}

/// Parses a characterization document from a JSON string.
pub fn parse_sysid_json(content: &str) -> Result<SysIdDocument> {
    let document: SysIdDocument = serde_json::from_str(content)?;
    document.validate()?;
    Ok(document)
}

/// Reads and parses a characterization JSON file.
pub fn load_sysid_json(input_file_path: &Path) -> Result<SysIdDocument> {
    let file = File::open(input_file_path).map_err(|source| AnalysisError::Io {
        path: input_file_path.display().to_string(),
        source,
    })?;
    let document: SysIdDocument = serde_json::from_reader(BufReader::new(file))?;
    document.validate()?;

    log::info!(
        "Loaded '{}' data ({}): {} / {} / {} / {} samples, trackwidth run {}",
        document.test,
        input_file_path.display(),
        document.slow_forward.len(),
        document.slow_backward.len(),
        document.fast_forward.len(),
        document.fast_backward.len(),
        if document.trackwidth.is_some() { "present" } else { "absent" }
    );

    Ok(document)
}
