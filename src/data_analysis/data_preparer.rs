// src/data_analysis/data_preparer.rs
//
// Turns the raw characterization runs into regression-ready datasets:
// sign/unit normalization, quasistatic trimming, windowed acceleration,
// step-voltage transient trimming and assembly of the named datasets.

use std::f64::consts::TAU;

use crate::analysis_type::AnalysisType;
use crate::constants::*;
use crate::data_analysis::prepared_data::{concatenate, Dataset, PreparedData};
use crate::data_input::raw_data::{Channel, RawSample};
use crate::data_input::sysid_json::RawRuns;
use crate::error::{AnalysisError, Result};
use crate::settings::Settings;
use crate::types::DatasetMap;

/// Parameters of one preparation pass, fixed for a loaded file.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub analysis_type: AnalysisType,
    /// Output units label, used to interpret arm angles.
    pub units: String,
    pub units_per_rotation: f64,
    pub motion_threshold: f64,
    pub window_size: usize,
    pub step_trim_caution: usize,
}

impl PrepareConfig {
    pub fn new(analysis_type: AnalysisType, units: &str, units_per_rotation: f64, settings: &Settings) -> Self {
        Self {
            analysis_type,
            units: units.to_string(),
            units_per_rotation,
            motion_threshold: settings.motion_threshold,
            window_size: settings.window_size,
            step_trim_caution: settings.step_trim_caution,
        }
    }
}

/// Converts a position in output units to radians according to the units label.
/// Unrecognized labels are taken as radians.
pub fn position_to_radians(position: f64, units: &str) -> f64 {
    match units.to_ascii_lowercase().as_str() {
        "degrees" | "degree" | "deg" => position.to_radians(),
        "rotations" | "rotation" | "revolutions" => position * TAU,
        _ => position,
    }
}

/// Forces motor voltages to share the sign of their velocities and scales
/// encoder readings by the units-per-rotation factor.
pub fn normalize_samples(data: &mut [RawSample], units_per_rotation: f64) {
    for sample in data.iter_mut() {
        *sample = sample.normalized(units_per_rotation);
    }
}

/// Removes quasistatic samples where the mechanism is not moving or not driven.
///
/// A sample is dropped when |voltage| <= 0 or |velocity| <= `threshold` on the
/// primary channel, or (for differential mechanisms) on the secondary channel.
pub fn trim_quasistatic_data(data: &mut Vec<RawSample>, threshold: f64, differential: bool) {
    let stalled = |sample: &RawSample, channel: Channel| {
        sample.voltage(channel).abs() <= 0.0 || sample.velocity(channel).abs() <= threshold
    };
    data.retain(|sample| {
        let primary = stalled(sample, Channel::Primary);
        let secondary = differential && stalled(sample, Channel::Secondary);
        !(primary || secondary)
    });
}

/// Computes acceleration with a central difference spanning `window` samples.
///
/// Produces one point per index in `[window/2, n - window/2)`. Points with an
/// acceleration of exactly zero are encoder-resolution artifacts and are dropped,
/// except in quasistatic runs where zero acceleration is expected.
pub fn compute_acceleration(
    data: &[RawSample],
    window: usize,
    channel: Channel,
    quasistatic: bool,
    test_name: &str,
) -> Result<Vec<PreparedData>> {
    if data.len() < window {
        return Err(AnalysisError::InsufficientData {
            test: test_name.to_string(),
            samples: data.len(),
            required: window,
        });
    }

    let step = window / 2;
    let mut prepared = Vec::with_capacity(data.len() - window);
    let mut non_finite = 0usize;

    for i in step..data.len() - step {
        let pt = &data[i];
        let ahead = &data[i + step];
        let behind = &data[i - step];
        let acceleration = (ahead.velocity(channel) - behind.velocity(channel))
            / (ahead.timestamp() - behind.timestamp());

        if !acceleration.is_finite() {
            non_finite += 1;
            continue;
        }
        if acceleration == 0.0 && !quasistatic {
            continue;
        }

        prepared.push(PreparedData {
            timestamp: pt.timestamp(),
            voltage: pt.voltage(channel),
            position: pt.position(channel),
            velocity: pt.velocity(channel),
            acceleration,
            cos: 0.0,
        });
    }

    if non_finite > 0 {
        log::warn!(
            "{}: skipped {} points with repeated timestamps across the acceleration window",
            test_name,
            non_finite
        );
    }

    Ok(prepared)
}

/// Drops the leading transient of a step-voltage run.
///
/// Scans for the peak acceleration magnitude, so forward and backward runs
/// trim alike: once `caution` consecutive samples after the running maximum
/// stay below it, every point before the peak is removed. If no such peak is
/// confirmed the data is left untouched.
pub fn trim_step_voltage_data(data: &mut Vec<PreparedData>, caution: usize) {
    let mut idx = 0;
    let mut decreasing = false;
    let mut confirmed = false;

    for i in 0..data.len() {
        let acc = data[i].acceleration.abs();
        let peak = data[idx].acceleration.abs();

        if !decreasing {
            if acc < peak {
                decreasing = true;
            } else {
                idx = i;
            }
        } else if acc >= peak {
            decreasing = false;
            idx = i;
        }

        if decreasing && i - idx == caution {
            confirmed = true;
            break;
        }
    }

    if confirmed && idx > 0 {
        data.drain(..idx);
    }
}

fn fill_cosine(data: &mut [PreparedData], units: &str) {
    for pt in data.iter_mut() {
        pt.cos = position_to_radians(pt.position, units).cos();
    }
}

/// Prepared quasistatic/dynamic runs for one channel.
struct ChannelRuns {
    slow_forward: Vec<PreparedData>,
    slow_backward: Vec<PreparedData>,
    fast_forward: Vec<PreparedData>,
    fast_backward: Vec<PreparedData>,
}

impl ChannelRuns {
    fn forward(&self) -> Dataset {
        Dataset::new(self.slow_forward.clone(), self.fast_forward.clone())
    }

    fn backward(&self) -> Dataset {
        Dataset::new(self.slow_backward.clone(), self.fast_backward.clone())
    }

    /// Left ++ right in every run.
    fn merge(&self, other: &ChannelRuns) -> ChannelRuns {
        ChannelRuns {
            slow_forward: concatenate(&self.slow_forward, &other.slow_forward),
            slow_backward: concatenate(&self.slow_backward, &other.slow_backward),
            fast_forward: concatenate(&self.fast_forward, &other.fast_forward),
            fast_backward: concatenate(&self.fast_backward, &other.fast_backward),
        }
    }

    fn insert_into(&self, datasets: &mut DatasetMap, prefix: &str) {
        let forward = self.forward();
        let backward = self.backward();
        let combined = forward.concat(&backward);
        datasets.insert(format!("{}{}", prefix, DATASET_FORWARD), forward);
        datasets.insert(format!("{}{}", prefix, DATASET_BACKWARD), backward);
        datasets.insert(format!("{}{}", prefix, DATASET_COMBINED), combined);
    }
}

fn take_run(runs: &RawRuns, key: &str) -> Result<Vec<RawSample>> {
    runs.get(key)
        .cloned()
        .ok_or_else(|| AnalysisError::FileFormat(format!("missing test run '{}'", key)))
}

fn prepare_channel(
    slow_forward: &[RawSample],
    slow_backward: &[RawSample],
    fast_forward: &[RawSample],
    fast_backward: &[RawSample],
    channel: Channel,
    config: &PrepareConfig,
) -> Result<ChannelRuns> {
    let window = config.window_size;
    let mut runs = ChannelRuns {
        slow_forward: compute_acceleration(slow_forward, window, channel, true, SLOW_FORWARD_KEY)?,
        slow_backward: compute_acceleration(slow_backward, window, channel, true, SLOW_BACKWARD_KEY)?,
        fast_forward: compute_acceleration(fast_forward, window, channel, false, FAST_FORWARD_KEY)?,
        fast_backward: compute_acceleration(fast_backward, window, channel, false, FAST_BACKWARD_KEY)?,
    };

    trim_step_voltage_data(&mut runs.fast_forward, config.step_trim_caution);
    trim_step_voltage_data(&mut runs.fast_backward, config.step_trim_caution);

    if config.analysis_type == AnalysisType::Arm {
        for run in [
            &mut runs.slow_forward,
            &mut runs.slow_backward,
            &mut runs.fast_forward,
            &mut runs.fast_backward,
        ] {
            fill_cosine(run, &config.units);
        }
    }

    log::debug!(
        "{:?} channel prepared: {} / {} quasistatic, {} / {} dynamic points",
        channel,
        runs.slow_forward.len(),
        runs.slow_backward.len(),
        runs.fast_forward.len(),
        runs.fast_backward.len()
    );

    Ok(runs)
}

/// Runs the full preparation pipeline and returns every named dataset.
///
/// Single-input mechanisms yield "Forward", "Backward" and "Combined".
/// Drivetrains additionally yield "Left …" and "Right …" variants; their
/// un-prefixed datasets hold left followed by right data.
pub fn prepare_datasets(runs: &RawRuns, config: &PrepareConfig) -> Result<DatasetMap> {
    let differential = config.analysis_type.is_differential();

    let mut slow_forward = take_run(runs, SLOW_FORWARD_KEY)?;
    let mut slow_backward = take_run(runs, SLOW_BACKWARD_KEY)?;
    let mut fast_forward = take_run(runs, FAST_FORWARD_KEY)?;
    let mut fast_backward = take_run(runs, FAST_BACKWARD_KEY)?;

    for run in [&mut slow_forward, &mut slow_backward, &mut fast_forward, &mut fast_backward] {
        normalize_samples(run, config.units_per_rotation);
    }

    let before = (slow_forward.len(), slow_backward.len());
    trim_quasistatic_data(&mut slow_forward, config.motion_threshold, differential);
    trim_quasistatic_data(&mut slow_backward, config.motion_threshold, differential);
    log::debug!(
        "Quasistatic trimming kept {}/{} forward and {}/{} backward samples",
        slow_forward.len(),
        before.0,
        slow_backward.len(),
        before.1
    );

    let mut datasets = DatasetMap::new();
    let primary = prepare_channel(
        &slow_forward,
        &slow_backward,
        &fast_forward,
        &fast_backward,
        Channel::Primary,
        config,
    )?;

    if differential {
        let secondary = prepare_channel(
            &slow_forward,
            &slow_backward,
            &fast_forward,
            &fast_backward,
            Channel::Secondary,
            config,
        )?;
        primary.merge(&secondary).insert_into(&mut datasets, "");
        primary.insert_into(&mut datasets, "Left ");
        secondary.insert_into(&mut datasets, "Right ");
    } else {
        primary.insert_into(&mut datasets, "");
    }

    for (name, dataset) in datasets.iter() {
        if dataset.dynamic.is_empty() {
            log::warn!("Dataset '{}' has no dynamic points after trimming", name);
        }
    }

    Ok(datasets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Primary channel at constant acceleration `accel` from rest, 10 ms steps.
    fn ramp(n: usize, volts: f64, accel: f64) -> Vec<RawSample> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.01;
                let v = accel * t;
                RawSample([t, 12.0, 0.5, volts, volts, 0.5 * accel * t * t, 0.0, v, v, 0.0])
            })
            .collect()
    }

    fn point(acc: f64) -> PreparedData {
        PreparedData { acceleration: acc, ..Default::default() }
    }

    fn config(analysis_type: AnalysisType) -> PrepareConfig {
        PrepareConfig::new(analysis_type, "Meters", 1.0, &Settings::default())
    }

    #[test]
    fn test_compute_acceleration_row_count() {
        for &(n, w) in &[(8usize, 8usize), (20, 8), (21, 4), (10, 2)] {
            let data = ramp(n, 3.0, 2.0);
            let out = compute_acceleration(&data, w, Channel::Primary, false, "fast-forward").unwrap();
            assert_eq!(out.len(), n - w, "n={} w={}", n, w);
        }
    }

    #[test]
    fn test_compute_acceleration_value_and_alignment() {
        let data = ramp(12, 3.0, 2.5);
        let out = compute_acceleration(&data, 4, Channel::Primary, false, "fast-forward").unwrap();
        assert_eq!(out[0].timestamp, data[2].timestamp());
        assert_eq!(out[0].velocity, data[2].velocity(Channel::Primary));
        for pt in &out {
            assert_relative_eq!(pt.acceleration, 2.5, epsilon = 1e-9);
            assert_eq!(pt.voltage, 3.0);
        }
    }

    #[test]
    fn test_compute_acceleration_insufficient_data() {
        let data = ramp(5, 3.0, 1.0);
        let err = compute_acceleration(&data, 8, Channel::Primary, false, "slow-forward").unwrap_err();
        match err {
            AnalysisError::InsufficientData { test, samples, required } => {
                assert_eq!(test, "slow-forward");
                assert_eq!(samples, 5);
                assert_eq!(required, 8);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_zero_acceleration_dropped_only_outside_quasistatic() {
        // Constant velocity: every acceleration is exactly zero.
        let data: Vec<RawSample> = (0..10)
            .map(|i| RawSample([i as f64 * 0.01, 12.0, 0.5, 2.0, 2.0, 0.0, 0.0, 1.0, 1.0, 0.0]))
            .collect();
        let dynamic = compute_acceleration(&data, 4, Channel::Primary, false, "fast-forward").unwrap();
        let quasistatic = compute_acceleration(&data, 4, Channel::Primary, true, "slow-forward").unwrap();
        assert!(dynamic.is_empty());
        assert_eq!(quasistatic.len(), 6);
    }

    #[test]
    fn test_secondary_channel_reads_right_side() {
        let data: Vec<RawSample> = (0..6)
            .map(|i| {
                let t = i as f64 * 0.1;
                RawSample([t, 12.0, 0.5, 1.0, 4.0, 0.0, 7.0, t, 3.0 * t, 0.0])
            })
            .collect();
        let out = compute_acceleration(&data, 2, Channel::Secondary, false, "fast-forward").unwrap();
        assert_eq!(out[0].voltage, 4.0);
        assert_eq!(out[0].position, 7.0);
        assert_relative_eq!(out[0].acceleration, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_trim_quasistatic_single_channel() {
        let mut data = vec![
            RawSample([0.0, 12.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0]), // zero voltage
            RawSample([0.1, 12.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.1, 1.0, 0.0]), // at threshold
            RawSample([0.2, 12.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0]), // secondary idle
            RawSample([0.3, 12.0, 0.0, -1.0, 1.0, 0.0, 0.0, -0.5, 1.0, 0.0]),
        ];
        trim_quasistatic_data(&mut data, 0.1, false);
        let ts: Vec<f64> = data.iter().map(|s| s.timestamp()).collect();
        assert_eq!(ts, vec![0.2, 0.3]);
    }

    #[test]
    fn test_trim_quasistatic_differential_checks_both_sides() {
        let mut data = vec![
            RawSample([0.2, 12.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0]), // right voltage zero
            RawSample([0.3, 12.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.5, 0.05, 0.0]), // right too slow
            RawSample([0.4, 12.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.5, 0.5, 0.0]),
        ];
        trim_quasistatic_data(&mut data, 0.1, true);
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].timestamp(), 0.4);
    }

    #[test]
    fn test_trim_step_voltage_removes_rising_transient() {
        let mut data: Vec<PreparedData> =
            [1.0, 3.0, 6.0, 5.0, 4.5, 4.0, 3.5, 3.0].iter().map(|&a| point(a)).collect();
        trim_step_voltage_data(&mut data, 3);
        let accs: Vec<f64> = data.iter().map(|p| p.acceleration).collect();
        assert_eq!(accs, vec![6.0, 5.0, 4.5, 4.0, 3.5, 3.0]);
    }

    #[test]
    fn test_trim_step_voltage_backward_run() {
        let mut data: Vec<PreparedData> =
            [-1.0, -3.0, -6.0, -5.0, -4.5, -4.0, -3.5, -3.0].iter().map(|&a| point(a)).collect();
        trim_step_voltage_data(&mut data, 3);
        assert_eq!(data.len(), 6);
        assert_eq!(data[0].acceleration, -6.0);
    }

    #[test]
    fn test_trim_step_voltage_cancels_on_new_peak() {
        // 6.0 dips for two samples, then 7.0 becomes the real peak.
        let mut data: Vec<PreparedData> =
            [2.0, 6.0, 5.0, 5.5, 7.0, 6.0, 5.0, 4.0, 3.0].iter().map(|&a| point(a)).collect();
        trim_step_voltage_data(&mut data, 3);
        assert_eq!(data[0].acceleration, 7.0);
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_trim_step_voltage_unconfirmed_peak_keeps_data() {
        let mut data: Vec<PreparedData> = [1.0, 2.0, 3.0, 2.5, 2.4].iter().map(|&a| point(a)).collect();
        trim_step_voltage_data(&mut data, 3);
        assert_eq!(data.len(), 5);
    }

    #[test]
    fn test_trim_step_voltage_caution_window_is_configurable() {
        let mut data: Vec<PreparedData> = [1.0, 4.0, 3.0, 2.0, 1.0].iter().map(|&a| point(a)).collect();
        trim_step_voltage_data(&mut data, 2);
        assert_eq!(data.len(), 4);
        assert_eq!(data[0].acceleration, 4.0);
    }

    fn runs(n: usize) -> RawRuns {
        let mut runs = RawRuns::new();
        runs.insert(SLOW_FORWARD_KEY.to_string(), ramp(n, 2.0, 0.5));
        runs.insert(SLOW_BACKWARD_KEY.to_string(), ramp(n, 2.0, 0.5));
        runs.insert(FAST_FORWARD_KEY.to_string(), ramp(n, 6.0, 3.0));
        runs.insert(FAST_BACKWARD_KEY.to_string(), ramp(n, 6.0, 3.0));
        runs
    }

    #[test]
    fn test_prepare_datasets_names_single_input() {
        let datasets = prepare_datasets(&runs(40), &config(AnalysisType::Simple)).unwrap();
        assert_eq!(datasets.len(), DATASET_NAMES.len());
        for name in DATASET_NAMES.iter() {
            assert!(datasets.contains_key(*name), "missing {}", name);
        }
    }

    #[test]
    fn test_prepare_datasets_combined_is_concatenation() {
        let datasets = prepare_datasets(&runs(40), &config(AnalysisType::Simple)).unwrap();
        let forward = &datasets["Forward"];
        let backward = &datasets["Backward"];
        let combined = &datasets["Combined"];
        assert_eq!(combined.quasistatic, concatenate(&forward.quasistatic, &backward.quasistatic));
        assert_eq!(combined.dynamic, concatenate(&forward.dynamic, &backward.dynamic));
    }

    #[test]
    fn test_prepare_datasets_drivetrain_variants() {
        let datasets = prepare_datasets(&runs(40), &config(AnalysisType::Drivetrain)).unwrap();
        assert_eq!(datasets.len(), DRIVETRAIN_DATASET_NAMES.len());
        for name in DRIVETRAIN_DATASET_NAMES.iter() {
            assert!(datasets.contains_key(*name), "missing {}", name);
        }
        let forward = &datasets["Forward"];
        let left = &datasets["Left Forward"];
        let right = &datasets["Right Forward"];
        assert_eq!(forward.quasistatic, concatenate(&left.quasistatic, &right.quasistatic));
        assert_eq!(forward.dynamic, concatenate(&left.dynamic, &right.dynamic));
    }

    #[test]
    fn test_prepare_datasets_quasistatic_respects_threshold() {
        let cfg = PrepareConfig { motion_threshold: 0.1, ..config(AnalysisType::Simple) };
        let datasets = prepare_datasets(&runs(60), &cfg).unwrap();
        for pt in datasets["Combined"].quasistatic.iter() {
            assert!(pt.velocity.abs() > 0.1);
            assert!(pt.voltage.abs() > 0.0);
        }
    }

    #[test]
    fn test_prepare_datasets_missing_run_is_format_error() {
        let mut r = runs(40);
        r.remove(FAST_BACKWARD_KEY);
        assert!(matches!(
            prepare_datasets(&r, &config(AnalysisType::Simple)),
            Err(AnalysisError::FileFormat(_))
        ));
    }

    #[test]
    fn test_arm_cosine_term() {
        let cfg = PrepareConfig { units: "Degrees".to_string(), ..config(AnalysisType::Arm) };
        let datasets = prepare_datasets(&runs(40), &cfg).unwrap();
        for pt in datasets["Combined"].iter() {
            assert_relative_eq!(pt.cos, pt.position.to_radians().cos(), epsilon = 1e-12);
        }
        let simple = prepare_datasets(&runs(40), &config(AnalysisType::Simple)).unwrap();
        assert!(simple["Combined"].iter().all(|p| p.cos == 0.0));
    }

    #[test]
    fn test_position_to_radians() {
        assert_relative_eq!(position_to_radians(180.0, "Degrees"), std::f64::consts::PI);
        assert_relative_eq!(position_to_radians(0.5, "Rotations"), std::f64::consts::PI);
        assert_eq!(position_to_radians(1.25, "Radians"), 1.25);
    }
}
