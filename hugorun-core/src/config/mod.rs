//! Configuration module for hugorun.
//!
//! Manages settings loaded from a JSON file.

mod settings;

pub use settings::Settings;
