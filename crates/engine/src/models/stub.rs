//! Deterministic tone-generating model
//!
//! Stands in for a real model during development and tests. Output length
//! is proportional to sentence length divided by speed; pitch depends on the
//! speaker and the sentence, so identical inputs give identical samples.

use speech_config::constants::audio::MODEL_SAMPLE_RATE;
use speech_core::{Error, Language, Result, SpeakerId};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::model::ModelHandle;

/// Samples per character at speed 1.0, as a fraction of the sample rate
const CHAR_DURATION_DIVISOR: u32 = 50;
const AMPLITUDE: f32 = 0.3;

/// Tone generator with the model family's speaker tables
pub struct StubModel {
    language: Language,
    sample_rate: u32,
    speakers: Vec<(String, SpeakerId)>,
    cache_releases: AtomicUsize,
}

impl StubModel {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            sample_rate: MODEL_SAMPLE_RATE,
            speakers: default_speakers(language),
            cache_releases: AtomicUsize::new(0),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_speakers(mut self, speakers: Vec<(String, SpeakerId)>) -> Self {
        self.speakers = speakers;
        self
    }

    /// How many times `release_cache` has been called
    pub fn cache_releases(&self) -> usize {
        self.cache_releases.load(Ordering::SeqCst)
    }

    /// Samples produced for a sentence at a given speed
    pub fn expected_len(&self, sentence: &str, speed: f32) -> usize {
        let per_char = (self.sample_rate / CHAR_DURATION_DIVISOR) as f32;
        (sentence.chars().count() as f32 * per_char / speed).round() as usize
    }
}

fn default_speakers(language: Language) -> Vec<(String, SpeakerId)> {
    let table: &[(&str, u32)] = match language {
        Language::En => &[
            ("EN-US", 0),
            ("EN-BR", 1),
            ("EN_INDIA", 2),
            ("EN-AU", 3),
            ("EN-Default", 4),
        ],
        Language::Zh => &[("ZH", 1)],
        Language::Es => &[("ES", 0)],
        Language::Fr => &[("FR", 0)],
        Language::Jp => &[("JP", 0)],
        Language::Kr => &[("KR", 0)],
    };

    table
        .iter()
        .map(|(name, id)| (name.to_string(), SpeakerId(*id)))
        .collect()
}

impl ModelHandle for StubModel {
    fn language(&self) -> Language {
        self.language
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speakers(&self) -> Vec<(String, SpeakerId)> {
        self.speakers.clone()
    }

    fn infer(&self, sentence: &str, speaker: SpeakerId, speed: f32) -> Result<Vec<f32>> {
        if !self.speakers.iter().any(|(_, id)| *id == speaker) {
            return Err(Error::inference(format!(
                "speaker {} not in {} model",
                speaker.0, self.language
            )));
        }

        let len = self.expected_len(sentence, speed);
        let seed: u32 = sentence.chars().map(|c| c as u32).fold(0u32, |acc, c| acc.wrapping_mul(31).wrapping_add(c));
        let freq = 160.0 + speaker.0 as f32 * 20.0 + (seed % 200) as f32;
        let step = 2.0 * std::f32::consts::PI * freq / self.sample_rate as f32;

        tracing::trace!(sentence, speaker = speaker.0, samples = len, "Stub inference");

        Ok((0..len).map(|i| (i as f32 * step).sin() * AMPLITUDE).collect())
    }

    fn release_cache(&self) {
        self.cache_releases.fetch_add(1, Ordering::SeqCst);
    }
}
