//! Per-language model contract
//!
//! A `ModelHandle` owns the runtime resources for one language. The engine
//! never looks inside it; it only sequences calls to segmentation,
//! inference and concatenation.

use speech_config::constants::inference;
use speech_core::{Language, Result, SpeakerId};

use crate::segment;

/// Synthesis resource for one language
pub trait ModelHandle: Send + Sync {
    /// Language this model was loaded for
    fn language(&self) -> Language;

    /// Native output sample rate (Hz)
    fn sample_rate(&self) -> u32;

    /// Speakers in the model's own order (name, identity)
    fn speakers(&self) -> Vec<(String, SpeakerId)>;

    /// Split text into ordered sentences
    fn segment(&self, text: &str) -> Vec<String> {
        segment::split_sentences(text, self.language())
    }

    /// Synthesize one sentence into mono samples
    ///
    /// Blocks until the waveform is produced. Callers must hold the
    /// synthesis gate.
    fn infer(&self, sentence: &str, speaker: SpeakerId, speed: f32) -> Result<Vec<f32>>;

    /// Join per-sentence waveforms into one
    fn concat(&self, segments: Vec<Vec<f32>>, _sample_rate: u32, _speed: f32) -> Vec<f32> {
        segments.concat()
    }

    /// Drop transient device-side caches
    fn release_cache(&self) {}
}

/// Sampling parameters for VITS-style models
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferenceParams {
    pub sdp_ratio: f32,
    pub noise_scale: f32,
    pub noise_scale_w: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            sdp_ratio: inference::SDP_RATIO,
            noise_scale: inference::NOISE_SCALE,
            noise_scale_w: inference::NOISE_SCALE_W,
        }
    }
}

impl InferenceParams {
    /// Duration multiplier for a speaking rate
    pub fn length_scale(speed: f32) -> f32 {
        1.0 / speed
    }
}
