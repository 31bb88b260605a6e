//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use speech_config::Settings;
use speech_engine::{SpeechEngine, Synthesizer};

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Settings>,
    /// Synthesis engine
    pub synthesizer: Arc<dyn Synthesizer>,
}

impl AppState {
    pub fn new(config: Settings, synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self {
            config: Arc::new(config),
            synthesizer,
        }
    }

    /// Load models and build the engine from configuration
    pub fn from_settings(config: Settings) -> Result<Self, speech_core::Error> {
        let engine = SpeechEngine::from_settings(&config)?;
        Ok(Self::new(config, Arc::new(engine)))
    }
}
