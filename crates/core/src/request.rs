//! Synthesis requests

use serde::{Deserialize, Serialize};

use crate::{AudioFormat, Error, Language, Result};

/// Voice used when a transport receives none
pub const DEFAULT_VOICE: &str = "en-us";

/// Speaking rate used when a transport receives none
pub const DEFAULT_SPEED: f32 = 1.0;

/// Slowest accepted speaking rate
pub const MIN_SPEED: f32 = 0.1;

/// Fastest accepted speaking rate
pub const MAX_SPEED: f32 = 10.0;

/// Request for one complete encoded audio buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
    pub format: AudioFormat,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            speed: DEFAULT_SPEED,
            format: AudioFormat::Wav,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Reject empty text and speed outside [MIN_SPEED, MAX_SPEED]
    pub fn validate(&self) -> Result<()> {
        validate_text_and_speed(&self.text, self.speed)
    }
}

/// Request for a lazily produced chunk stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub text: String,
    pub voice: String,
    pub speed: f32,
    /// Output rate; the model's native rate when absent
    pub sample_rate: Option<u32>,
}

impl StreamRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            speed: DEFAULT_SPEED,
            sample_rate: None,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_text_and_speed(&self.text, self.speed)?;
        if self.sample_rate == Some(0) {
            return Err(Error::invalid_argument("sample_rate must be positive"));
        }
        Ok(())
    }
}

fn validate_text_and_speed(text: &str, speed: f32) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::invalid_argument("text is required"));
    }
    if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
        return Err(Error::invalid_argument(format!(
            "speed must be between {} and {}, got {}",
            MIN_SPEED, MAX_SPEED, speed
        )));
    }
    Ok(())
}

/// Voice listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Lower-case voice key
    pub name: String,
    pub language: Language,
}
