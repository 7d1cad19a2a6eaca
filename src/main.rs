// src/main.rs

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Parser;

use mechid::analysis_manager::{AnalysisManager, Gains};
use mechid::analysis_type::AnalysisType;
use mechid::constants::*;
use mechid::data_analysis::feedback::{FeedbackLoopType, LqrParameters};
use mechid::data_analysis::feedback_preset::{FeedbackControllerPreset, FEEDBACK_PRESETS};
use mechid::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "mechid", version = mechid::crate_version())]
#[command(about = "Feedforward and feedback gains from logged mechanism characterization runs")]
struct Args {
    /// Characterization JSON file
    #[arg(required_unless_present = "list_presets")]
    input: Option<PathBuf>,

    /// Dataset used for the fit ("Combined", "Forward", "Left Backward", ...)
    #[arg(long, default_value = DATASET_COMBINED)]
    dataset: String,

    /// Feedback loop to design (position or velocity)
    #[arg(long = "loop", default_value = "velocity")]
    loop_type: FeedbackLoopType,

    /// Motor controller preset
    #[arg(long, default_value = "Default")]
    preset: String,

    /// Maximum acceptable position error
    #[arg(long, default_value_t = DEFAULT_MAX_POSITION_ERROR)]
    qp: f64,

    /// Maximum acceptable velocity error
    #[arg(long, default_value_t = DEFAULT_MAX_VELOCITY_ERROR)]
    qv: f64,

    /// Maximum control effort in volts
    #[arg(long, default_value_t = DEFAULT_MAX_CONTROL_EFFORT)]
    r: f64,

    /// Acceleration window size in samples (even)
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,

    /// Quasistatic motion threshold in units per second
    #[arg(long, default_value_t = DEFAULT_MOTION_THRESHOLD)]
    threshold: f64,

    /// Also write the results as pretty-printed JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print the available controller presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_presets {
        print_presets();
        return Ok(());
    }
    let input = args.input.as_ref().ok_or("no input file given")?;

    let settings = Settings {
        motion_threshold: args.threshold,
        window_size: args.window,
        dataset: args.dataset.clone(),
        loop_type: args.loop_type,
        preset: FeedbackControllerPreset::by_name(&args.preset)?,
        lqr: LqrParameters { qp: args.qp, qv: args.qv, r: args.r },
        ..Settings::default()
    };

    let manager = AnalysisManager::load(input, settings)?;

    println!("\n--- {} analysis of {} ---", manager.analysis_type(), input.display());
    println!("Units: {} ({} per rotation)", manager.unit(), manager.factor());
    println!("Datasets: {}", manager.dataset_names().join(", "));
    print_gains(&manager, &args.preset);

    if let Some(json_path) = &args.json {
        let writer = BufWriter::new(File::create(json_path)?);
        serde_json::to_writer_pretty(writer, &JsonReport::new(&manager, &args.preset))?;
        println!("\nResults written to '{}'.", json_path.display());
    }

    Ok(())
}

fn print_presets() {
    println!("Available presets:");
    for (name, preset) in FEEDBACK_PRESETS.iter() {
        println!(
            "  {:<20} period {:.3} s, output x{:.4}, velocity time base {} s, delays {:.4} / {:.4} s",
            name,
            preset.period,
            preset.output_conversion_factor,
            preset.output_velocity_time_factor,
            preset.position_measurement_delay,
            preset.velocity_measurement_delay
        );
    }
}

fn print_gains(manager: &AnalysisManager, preset_name: &str) {
    let settings = manager.settings();
    let gains = manager.gains();
    let ff = &gains.feedforward;

    println!("\n--- Feedforward ('{}') ---", settings.dataset);
    println!("  Ks   = {:.5} V", ff.ks());
    println!("  Kv   = {:.5} V/({}/s)", ff.kv(), manager.unit());
    println!("  Ka   = {:.5} V/({}/s^2)", ff.ka(), manager.unit());
    if let (Some(name), Some(value)) = (manager.analysis_type().gravity_term_name(), ff.gravity()) {
        println!("  {:<4} = {:.5} V", name, value);
    }
    println!("  r^2  = {:.5}, RMSE = {:.5} V", ff.r_squared, ff.rmse);
    if ff.is_poor_fit() {
        println!("  WARNING: fit quality is low; gains may be unreliable.");
    }

    println!("\n--- Feedback ({} loop, preset '{}') ---", settings.loop_type, preset_name);
    println!("  Kp = {:.5}", gains.kp);
    println!("  Kd = {:.5}", gains.kd);

    if manager.analysis_type() == AnalysisType::Drivetrain {
        match gains.track_width {
            Some(width) => println!("\n  Track width = {:.5} {}", width, manager.unit()),
            None => println!("\n  Track width: unavailable (no usable track width run)."),
        }
    }
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    test: &'static str,
    units: &'a str,
    units_per_rotation: f64,
    dataset: &'a str,
    loop_type: FeedbackLoopType,
    preset: &'a str,
    lqr: LqrParameters,
    gains: &'a Gains,
}

impl<'a> JsonReport<'a> {
    fn new(manager: &'a AnalysisManager, preset: &'a str) -> Self {
        let settings = manager.settings();
        Self {
            version: mechid::crate_version(),
            test: manager.analysis_type().name(),
            units: manager.unit(),
            units_per_rotation: manager.factor(),
            dataset: &settings.dataset,
            loop_type: settings.loop_type,
            preset,
            lqr: settings.lqr,
            gains: manager.gains(),
        }
    }
}
