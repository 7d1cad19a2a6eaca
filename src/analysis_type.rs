// src/analysis_type.rs

use std::fmt;

use crate::error::{AnalysisError, Result};

/// Kind of mechanism a data file was recorded from.
///
/// Determines how many independent variables the feedforward fit uses and
/// which dataset variants are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisType {
    Drivetrain,
    Elevator,
    Arm,
    Simple,
}

/// All analysis types, in the order the `test` field documents them.
pub const ANALYSIS_TYPES: [AnalysisType; 4] = [
    AnalysisType::Drivetrain,
    AnalysisType::Elevator,
    AnalysisType::Arm,
    AnalysisType::Simple,
];

impl AnalysisType {
    /// Parse the `test` field of a data file.
    pub fn from_name(name: &str) -> Result<Self> {
        ANALYSIS_TYPES
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| AnalysisError::UnknownAnalysisType(name.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalysisType::Drivetrain => "Drivetrain",
            AnalysisType::Elevator => "Elevator",
            AnalysisType::Arm => "Arm",
            AnalysisType::Simple => "Simple",
        }
    }

    /// Number of feedforward coefficients (Ks, Kv, Ka and optionally Kg/Kcos).
    pub fn independent_variables(&self) -> usize {
        match self {
            AnalysisType::Drivetrain | AnalysisType::Simple => 3,
            AnalysisType::Elevator | AnalysisType::Arm => 4,
        }
    }

    /// Label of the fourth feedforward coefficient, if any.
    pub fn gravity_term_name(&self) -> Option<&'static str> {
        match self {
            AnalysisType::Elevator => Some("Kg"),
            AnalysisType::Arm => Some("Kcos"),
            _ => None,
        }
    }

    /// Drivetrains log two independently driven sides.
    pub fn is_differential(&self) -> bool {
        matches!(self, AnalysisType::Drivetrain)
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(AnalysisType::from_name("Drivetrain").unwrap(), AnalysisType::Drivetrain);
        assert_eq!(AnalysisType::from_name("Elevator").unwrap(), AnalysisType::Elevator);
        assert_eq!(AnalysisType::from_name("Arm").unwrap(), AnalysisType::Arm);
        assert_eq!(AnalysisType::from_name("Simple").unwrap(), AnalysisType::Simple);
    }

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert!(matches!(
            AnalysisType::from_name("arm"),
            Err(AnalysisError::UnknownAnalysisType(_))
        ));
    }

    #[test]
    fn test_independent_variables() {
        assert_eq!(AnalysisType::Drivetrain.independent_variables(), 3);
        assert_eq!(AnalysisType::Simple.independent_variables(), 3);
        assert_eq!(AnalysisType::Elevator.independent_variables(), 4);
        assert_eq!(AnalysisType::Arm.independent_variables(), 4);
    }
}
