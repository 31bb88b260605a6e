//! Configuration management for the speech server
//!
//! Settings are layered from `config/default.*`, an optional
//! environment-specific file, and `SPEECH__*` environment variables.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, EngineSettings, GateScope, ModelBackend, ModelSpec,
    ObservabilitySettings, ServerSettings, Settings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<ConfigError> for speech_core::Error {
    fn from(err: ConfigError) -> Self {
        speech_core::Error::Config(err.to_string())
    }
}
