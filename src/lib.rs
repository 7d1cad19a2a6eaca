// src/lib.rs - Library interface for the characterization pipeline

pub mod analysis_manager;
pub mod analysis_type;
pub mod constants;
pub mod data_analysis;
pub mod data_input;
pub mod error;
pub mod settings;
pub mod types;

// Expose crate version derived from vergen-generated env vars at compile time.
pub fn crate_version() -> &'static str {
    option_env!("VERGEN_GIT_SEMVER").unwrap_or(env!("CARGO_PKG_VERSION"))
}
