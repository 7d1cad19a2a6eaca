// src/analysis_manager.rs
//
// Owns one loaded characterization file and the gains derived from it.

use std::path::Path;

use serde::Serialize;

use crate::analysis_type::AnalysisType;
use crate::data_analysis::data_preparer::{prepare_datasets, PrepareConfig};
use crate::data_analysis::feedback::{calculate_feedback_gains, FeedbackLoopType, LqrParameters};
use crate::data_analysis::feedback_preset::FeedbackControllerPreset;
use crate::data_analysis::feedforward::{calculate_feedforward_gains, FeedforwardGains};
use crate::data_analysis::prepared_data::Dataset;
use crate::data_analysis::track_width::track_width_from_run;
use crate::data_input::sysid_json::{load_sysid_json, SysIdDocument};
use crate::error::{AnalysisError, Result};
use crate::settings::Settings;
use crate::types::DatasetMap;

/// Result of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gains {
    pub feedforward: FeedforwardGains,
    pub kp: f64,
    pub kd: f64,
    /// Effective track width, for drivetrain files with a track width run.
    pub track_width: Option<f64>,
}

/// Loaded file, prepared datasets, current settings and the gains they produce.
///
/// Every mutation recomputes synchronously. A failed recompute leaves the
/// previous settings, datasets and gains in place.
#[derive(Debug)]
pub struct AnalysisManager {
    document: SysIdDocument,
    analysis_type: AnalysisType,
    datasets: DatasetMap,
    settings: Settings,
    track_width: Option<f64>,
    gains: Gains,
}

impl AnalysisManager {
    /// Reads `path` and runs the full analysis with `settings`.
    pub fn load(path: &Path, settings: Settings) -> Result<Self> {
        let document = load_sysid_json(path)?;
        Self::from_document(document, settings)
    }

    pub fn from_document(document: SysIdDocument, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let analysis_type = document.analysis_type()?;

        let datasets = prepare(&document, analysis_type, &settings)?;

        let track_width = match (&document.trackwidth, analysis_type) {
            (Some(run), AnalysisType::Drivetrain) => match track_width_from_run(run, document.units_per_rotation) {
                Ok(width) => Some(width),
                Err(e) => {
                    log::warn!("Track width unavailable: {}", e);
                    None
                }
            },
            (Some(_), _) => {
                log::warn!("Ignoring track width run for a {} analysis", analysis_type);
                None
            }
            (None, _) => None,
        };

        let gains = compute_gains(&datasets, analysis_type, &settings, track_width)?;
        log::info!(
            "Analysis ready: {} with {} datasets, using '{}'",
            analysis_type,
            datasets.len(),
            settings.dataset
        );

        Ok(Self { document, analysis_type, datasets, settings, track_width, gains })
    }

    /// Recomputes the gains from the current settings.
    pub fn calculate(&self) -> Result<Gains> {
        compute_gains(&self.datasets, self.analysis_type, &self.settings, self.track_width)
    }

    /// Gains of the last successful computation.
    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn select_dataset(&mut self, name: &str) -> Result<&Gains> {
        let settings = Settings { dataset: name.to_string(), ..self.settings.clone() };
        self.apply_settings(settings)
    }

    pub fn change_parameters(&mut self, lqr: LqrParameters) -> Result<&Gains> {
        let settings = Settings { lqr, ..self.settings.clone() };
        self.apply_settings(settings)
    }

    pub fn set_preset(&mut self, preset: FeedbackControllerPreset) -> Result<&Gains> {
        let settings = Settings { preset, ..self.settings.clone() };
        self.apply_settings(settings)
    }

    pub fn set_loop_type(&mut self, loop_type: FeedbackLoopType) -> Result<&Gains> {
        let settings = Settings { loop_type, ..self.settings.clone() };
        self.apply_settings(settings)
    }

    /// Replaces every setting at once. Datasets are re-prepared only when
    /// a preparation parameter changed.
    pub fn apply_settings(&mut self, settings: Settings) -> Result<&Gains> {
        settings.validate()?;

        let reprepare = settings.motion_threshold != self.settings.motion_threshold
            || settings.window_size != self.settings.window_size
            || settings.step_trim_caution != self.settings.step_trim_caution;

        if reprepare {
            let datasets = prepare(&self.document, self.analysis_type, &settings)?;
            let gains = compute_gains(&datasets, self.analysis_type, &settings, self.track_width)?;
            self.datasets = datasets;
            self.gains = gains;
        } else {
            self.gains = compute_gains(&self.datasets, self.analysis_type, &settings, self.track_width)?;
        }
        self.settings = settings;
        Ok(&self.gains)
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    pub fn unit(&self) -> &str {
        &self.document.units
    }

    pub fn factor(&self) -> f64 {
        self.document.units_per_rotation
    }

    pub fn dataset_names(&self) -> Vec<&str> {
        self.datasets.keys().map(String::as_str).collect()
    }

    pub fn dataset(&self, name: &str) -> Result<&Dataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| AnalysisError::UnknownDataset(name.to_string()))
    }
}

fn prepare(document: &SysIdDocument, analysis_type: AnalysisType, settings: &Settings) -> Result<DatasetMap> {
    let config = PrepareConfig::new(analysis_type, &document.units, document.units_per_rotation, settings);
    prepare_datasets(&document.raw_runs(), &config)
}

fn compute_gains(
    datasets: &DatasetMap,
    analysis_type: AnalysisType,
    settings: &Settings,
    track_width: Option<f64>,
) -> Result<Gains> {
    let dataset = datasets
        .get(&settings.dataset)
        .ok_or_else(|| AnalysisError::UnknownDataset(settings.dataset.clone()))?;

    let feedforward = calculate_feedforward_gains(dataset, analysis_type)?;
    let (kp, kd) = calculate_feedback_gains(&settings.preset, &settings.lqr, &feedforward, settings.loop_type)?;
    log::debug!(
        "'{}' gains: {:?}, Kp = {:.4}, Kd = {:.4}",
        settings.dataset,
        feedforward.coefficients,
        kp,
        kd
    );

    Ok(Gains { feedforward, kp, kd, track_width })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_analysis::feedback_preset::PRESET_CTRE_NEW;
    use crate::data_input::raw_data::RawSample;
    use approx::assert_relative_eq;

    const KS: f64 = 0.6;
    const KV: f64 = 2.5;
    const KA: f64 = 0.4;

    /// Simulates `V = Ks + Kv v + Ka a` under a constant-ramp or step voltage.
    fn simulate(ramp: f64, step: f64, direction: f64) -> Vec<RawSample> {
        let dt = 0.005;
        let (mut pos, mut vel) = (0.0_f64, 0.0_f64);
        let mut run = Vec::new();
        for i in 0..400 {
            let t = i as f64 * dt;
            let volts = direction * (step + ramp * t);
            let acc = if volts.abs() > KS { (volts - KS * volts.signum() - KV * vel) / KA } else { 0.0 };
            vel += acc * dt;
            pos += vel * dt;
            // Both sides of a drivetrain see the same motion.
            run.push(RawSample([t, 12.0, vel, volts, volts, pos, pos, vel, vel, 0.0]));
        }
        run
    }

    fn document(test: &str) -> SysIdDocument {
        SysIdDocument {
            test: test.to_string(),
            units: "Meters".to_string(),
            units_per_rotation: 1.0,
            slow_forward: simulate(1.0, 0.0, 1.0),
            slow_backward: simulate(1.0, 0.0, -1.0),
            fast_forward: simulate(0.0, 6.0, 1.0),
            fast_backward: simulate(0.0, 6.0, -1.0),
            trackwidth: None,
        }
    }

    #[test]
    fn test_recovers_simulated_feedforward() {
        let manager = AnalysisManager::from_document(document("Simple"), Settings::default()).unwrap();
        let ff = &manager.gains().feedforward;
        assert_relative_eq!(ff.ks(), KS, epsilon = 0.05);
        assert_relative_eq!(ff.kv(), KV, epsilon = 0.05);
        assert_relative_eq!(ff.ka(), KA, epsilon = 0.05);
        assert!(manager.gains().kp > 0.0);
        assert_eq!(manager.gains().kd, 0.0);
    }

    #[test]
    fn test_dataset_names_and_getters() {
        let manager = AnalysisManager::from_document(document("Elevator"), Settings::default()).unwrap();
        assert_eq!(manager.dataset_names(), vec!["Backward", "Combined", "Forward"]);
        assert_eq!(manager.analysis_type(), AnalysisType::Elevator);
        assert_eq!(manager.unit(), "Meters");
        assert_eq!(manager.factor(), 1.0);
        let combined = manager.dataset("Combined").unwrap();
        let forward = manager.dataset("Forward").unwrap();
        let backward = manager.dataset("Backward").unwrap();
        assert_eq!(combined.len(), forward.len() + backward.len());
    }

    #[test]
    fn test_selection_is_idempotent() {
        let mut manager = AnalysisManager::from_document(document("Simple"), Settings::default()).unwrap();
        let first = manager.select_dataset("Forward").unwrap().clone();
        manager.select_dataset("Combined").unwrap();
        let second = manager.select_dataset("Forward").unwrap().clone();
        assert_eq!(first.feedforward.coefficients, second.feedforward.coefficients);
        assert_eq!(first.kp.to_bits(), second.kp.to_bits());
        assert_eq!(manager.calculate().unwrap(), second);
    }

    #[test]
    fn test_failed_change_keeps_previous_state() {
        let mut manager = AnalysisManager::from_document(document("Simple"), Settings::default()).unwrap();
        let before = manager.gains().clone();

        assert!(matches!(manager.select_dataset("Sideways"), Err(AnalysisError::UnknownDataset(_))));
        assert!(manager
            .change_parameters(LqrParameters { qp: 1.0, qv: -1.0, r: 7.0 })
            .is_err());

        assert_eq!(manager.gains(), &before);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_loop_type_and_preset_changes() {
        let mut manager = AnalysisManager::from_document(document("Simple"), Settings::default()).unwrap();
        let velocity_kp = manager.gains().kp;

        let position = manager.set_loop_type(FeedbackLoopType::Position).unwrap().clone();
        assert!(position.kp > 0.0);
        assert!(position.kd > 0.0);

        manager.set_loop_type(FeedbackLoopType::Velocity).unwrap();
        let ctre = manager.set_preset(PRESET_CTRE_NEW).unwrap();
        assert!(ctre.kp != velocity_kp);
        assert_eq!(manager.settings().preset, PRESET_CTRE_NEW);
    }

    #[test]
    fn test_window_change_reprepares_datasets() {
        let mut manager = AnalysisManager::from_document(document("Simple"), Settings::default()).unwrap();
        let before = manager.dataset("Forward").unwrap().quasistatic.len();
        let settings = Settings { window_size: 16, ..manager.settings().clone() };
        manager.apply_settings(settings).unwrap();
        assert_eq!(manager.dataset("Forward").unwrap().quasistatic.len(), before - 8);
    }

    #[test]
    fn test_drivetrain_variants_and_track_width() {
        let mut doc = document("Drivetrain");
        doc.trackwidth = Some(vec![
            RawSample([0.0, 12.0, 0.0, -3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            RawSample([1.0, 12.0, 0.0, -3.0, 3.0, -0.5, 0.5, 0.0, 0.0, 2.0]),
        ]);
        let manager = AnalysisManager::from_document(doc, Settings::default()).unwrap();
        assert_eq!(manager.dataset_names().len(), 9);
        assert!(manager.dataset("Left Forward").is_ok());
        assert!(manager.dataset("Right Combined").is_ok());
        assert_relative_eq!(manager.gains().track_width.unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_track_width_run_keeps_gains() {
        let mut doc = document("Drivetrain");
        doc.trackwidth = Some(vec![
            RawSample([0.0, 12.0, 0.0, -3.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            RawSample([1.0, 12.0, 0.0, -3.0, 3.0, -0.5, 0.5, 0.0, 0.0, 0.0]),
        ]);
        let manager = AnalysisManager::from_document(doc, Settings::default()).unwrap();
        assert!(manager.gains().track_width.is_none());
        assert!(manager.gains().kp > 0.0);
        assert_eq!(manager.dataset_names().len(), 9);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(matches!(
            AnalysisManager::from_document(document("Turret"), Settings::default()),
            Err(AnalysisError::UnknownAnalysisType(_))
        ));
    }
}
