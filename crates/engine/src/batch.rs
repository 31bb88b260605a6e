//! Whole-utterance synthesis
//!
//! Every sentence is synthesized under one hold of the gate, so a batch is
//! atomic with respect to other requests. The result is a single encoded
//! buffer; partial results are never returned.

use speech_core::{Error, Result, SynthesisRequest};
use std::sync::Arc;
use std::time::Instant;

use crate::encoder::AudioEncoder;
use crate::gate::SynthesisGate;
use crate::metrics::{self, Mode};
use crate::registry::VoiceRegistry;
use crate::segment::normalize_sentence;

pub struct BatchSynthesizer {
    registry: Arc<VoiceRegistry>,
    gate: SynthesisGate,
}

impl BatchSynthesizer {
    pub fn new(registry: Arc<VoiceRegistry>, gate: SynthesisGate) -> Self {
        Self { registry, gate }
    }

    /// Synthesize `request.text` and encode it as `request.format`
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        let started = Instant::now();
        metrics::record_request(Mode::Batch);

        let result = self.run(request);
        let elapsed = started.elapsed();

        match &result {
            Ok(bytes) => {
                metrics::record_synthesis_duration(Mode::Batch, elapsed.as_secs_f64());
                tracing::info!(
                    voice = %request.voice,
                    format = %request.format,
                    bytes = bytes.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Batch synthesis complete"
                );
            }
            Err(e) => {
                metrics::record_error(e.kind());
                tracing::warn!(voice = %request.voice, error = %e, "Batch synthesis failed");
            }
        }

        result
    }

    fn run(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        request.validate()?;
        let voice = self.registry.resolve(&request.voice)?;
        AudioEncoder::ensure_supported(request.format)?;
        let model = &voice.model;

        let sentences = model.segment(&request.text);
        if sentences.is_empty() {
            return Err(Error::invalid_argument("text contains no speakable sentences"));
        }

        tracing::debug!(
            voice = %voice.key,
            language = %voice.language,
            sentences = sentences.len(),
            "Starting batch synthesis"
        );

        let segments = {
            let _gate = self.gate.acquire();
            let mut segments = Vec::with_capacity(sentences.len());
            for sentence in &sentences {
                let prepared = normalize_sentence(sentence, voice.language);
                segments.push(model.infer(&prepared, voice.speaker, request.speed)?);
            }
            segments
        };
        model.release_cache();

        let sample_rate = model.sample_rate();
        let waveform = model.concat(segments, sample_rate, request.speed);
        AudioEncoder::encode(&waveform, sample_rate, request.format)
    }
}
