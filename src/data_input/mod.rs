// src/data_input/mod.rs

pub mod raw_data;
pub mod sysid_json;

// src/data_input/mod.rs
