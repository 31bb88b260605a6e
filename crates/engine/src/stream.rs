//! Sentence-by-sentence streaming synthesis
//!
//! `SynthesisStream` is lazy: nothing is validated, resolved or synthesized
//! until the first call to `next`. Under the default gate scope the gate is
//! taken before the first inference and held across consumer pulls until
//! the stream is drained, closed, dropped or fails.

use speech_config::GateScope;
use speech_core::{AudioChunk, Error, Result, StreamRequest};
use std::iter::FusedIterator;
use std::sync::Arc;
use std::time::Instant;

use crate::gate::{GateGuard, SynthesisGate};
use crate::metrics::{self, Mode};
use crate::registry::{ResolvedVoice, VoiceRegistry};
use crate::resample::resample_mono;
use crate::segment::normalize_sentence;

/// Silence samples appended after each sentence
pub fn silence_samples(sample_rate: u32, silence_secs: f64, speed: f32) -> usize {
    (sample_rate as f64 * silence_secs / speed as f64).round() as usize
}

pub struct StreamingSynthesizer {
    registry: Arc<VoiceRegistry>,
    gate: SynthesisGate,
    silence_secs: f64,
    scope: GateScope,
}

impl StreamingSynthesizer {
    pub fn new(registry: Arc<VoiceRegistry>, gate: SynthesisGate, silence_secs: f64, scope: GateScope) -> Self {
        Self {
            registry,
            gate,
            silence_secs,
            scope,
        }
    }

    /// Create a lazy chunk stream for `request`
    pub fn synthesize(&self, request: StreamRequest) -> SynthesisStream {
        metrics::record_request(Mode::Stream);
        SynthesisStream {
            registry: self.registry.clone(),
            gate: self.gate.clone(),
            silence_secs: self.silence_secs,
            scope: self.scope,
            state: State::Pending(request),
            started: Instant::now(),
        }
    }
}

enum State {
    Pending(StreamRequest),
    Running(Running),
    Done,
}

struct Running {
    voice: ResolvedVoice,
    sentences: Vec<String>,
    next: usize,
    speed: f32,
    output_rate: u32,
    silence_len: usize,
    guard: Option<GateGuard>,
}

impl Running {
    fn next_chunk(&mut self, gate: &SynthesisGate, scope: GateScope) -> Result<AudioChunk> {
        let index = self.next;
        let sentence = normalize_sentence(&self.sentences[index], self.voice.language);
        let model = &self.voice.model;

        let samples = match scope {
            GateScope::Stream => {
                if self.guard.is_none() {
                    self.guard = Some(gate.acquire());
                }
                model.infer(&sentence, self.voice.speaker, self.speed)?
            }
            GateScope::Sentence => {
                let _gate = gate.acquire();
                model.infer(&sentence, self.voice.speaker, self.speed)?
            }
        };

        let model_rate = model.sample_rate();
        let mut samples = if self.output_rate != model_rate {
            resample_mono(&samples, model_rate, self.output_rate)?
        } else {
            samples
        };
        let padded = samples
            .len()
            .checked_add(self.silence_len)
            .ok_or_else(|| Error::inference("chunk length overflows"))?;
        samples.resize(padded, 0.0);

        self.next += 1;
        Ok(AudioChunk {
            samples,
            sample_rate: self.output_rate,
            index,
            is_last: self.next == self.sentences.len(),
        })
    }
}

/// Lazy sequence of audio chunks, one per sentence
pub struct SynthesisStream {
    registry: Arc<VoiceRegistry>,
    gate: SynthesisGate,
    silence_secs: f64,
    scope: GateScope,
    state: State,
    started: Instant,
}

impl SynthesisStream {
    /// Stop early; releases the gate if held
    pub fn close(&mut self) {
        if let State::Running(running) = &self.state {
            tracing::debug!(
                voice = %running.voice.key,
                emitted = running.next,
                total = running.sentences.len(),
                "Stream closed early"
            );
        }
        self.state = State::Done;
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Number of sentences, once the stream has started
    pub fn sentence_count(&self) -> Option<usize> {
        match &self.state {
            State::Running(running) => Some(running.sentences.len()),
            _ => None,
        }
    }

    fn start(&mut self, request: StreamRequest) -> Result<()> {
        request.validate()?;

        let voice = self.registry.resolve(&request.voice)?;
        let sentences = voice.model.segment(&request.text);
        if sentences.is_empty() {
            return Err(Error::invalid_argument("text contains no speakable sentences"));
        }

        let output_rate = request.sample_rate.unwrap_or_else(|| voice.model.sample_rate());
        let silence_len = silence_samples(output_rate, self.silence_secs, request.speed);

        tracing::debug!(
            voice = %voice.key,
            language = %voice.language,
            sentences = sentences.len(),
            sample_rate = output_rate,
            "Starting streaming synthesis"
        );

        self.state = State::Running(Running {
            voice,
            sentences,
            next: 0,
            speed: request.speed,
            output_rate,
            silence_len,
            guard: None,
        });
        Ok(())
    }

    fn finish(&mut self) {
        if let State::Running(mut running) = std::mem::replace(&mut self.state, State::Done) {
            let _gate = running.guard.take().unwrap_or_else(|| self.gate.acquire());
            running.voice.model.release_cache();

            let elapsed = self.started.elapsed();
            metrics::record_synthesis_duration(Mode::Stream, elapsed.as_secs_f64());
            tracing::info!(
                voice = %running.voice.key,
                chunks = running.sentences.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Streaming synthesis complete"
            );
        }
    }

    fn fail(&mut self, error: Error) -> Error {
        metrics::record_error(error.kind());
        match &self.state {
            State::Running(running) => tracing::warn!(
                voice = %running.voice.key,
                chunk_index = running.next,
                error = %error,
                "Streaming synthesis failed"
            ),
            _ => tracing::warn!(error = %error, "Streaming synthesis rejected"),
        }
        self.state = State::Done;
        error
    }
}

impl Iterator for SynthesisStream {
    type Item = Result<AudioChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending(_)) {
            if let State::Pending(request) = std::mem::replace(&mut self.state, State::Done) {
                if let Err(e) = self.start(request) {
                    return Some(Err(self.fail(e)));
                }
            }
        }

        let result = match &mut self.state {
            State::Running(running) => running.next_chunk(&self.gate, self.scope),
            _ => return None,
        };

        match result {
            Ok(chunk) => {
                metrics::record_chunk();
                tracing::trace!(chunk_index = chunk.index, samples = chunk.samples.len(), "Chunk ready");
                if chunk.is_last {
                    self.finish();
                }
                Some(Ok(chunk))
            }
            Err(e) => Some(Err(self.fail(e))),
        }
    }
}

impl FusedIterator for SynthesisStream {}

impl Drop for SynthesisStream {
    fn drop(&mut self) {
        if let State::Running(running) = &self.state {
            tracing::debug!(
                voice = %running.voice.key,
                emitted = running.next,
                total = running.sentences.len(),
                "Stream dropped before completion"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelHandle;
    use crate::models::StubModel;
    use speech_core::{Language, SpeakerId};

    fn streaming(scope: GateScope) -> (StreamingSynthesizer, Arc<StubModel>, SynthesisGate) {
        let model = Arc::new(StubModel::new(Language::En).with_sample_rate(24000));
        let handle: Arc<dyn ModelHandle> = model.clone();
        let registry = Arc::new(VoiceRegistry::from_models([(Language::En, handle)]).unwrap());
        let gate = SynthesisGate::new();
        (StreamingSynthesizer::new(registry, gate.clone(), 0.05, scope), model, gate)
    }

    const THREE: &str = "First sentence. Second one here. And the third!";

    #[test]
    fn test_silence_scales_inversely_with_speed() {
        assert_eq!(silence_samples(24000, 0.05, 1.0), 1200);
        assert_eq!(silence_samples(24000, 0.05, 2.0), 600);
        assert_eq!(silence_samples(44100, 0.05, 1.0), 2205);
    }

    #[test]
    fn test_lazy_until_first_pull() {
        let (synth, model, gate) = streaming(GateScope::Stream);
        let stream = synth.synthesize(StreamRequest::new("", "nobody"));
        assert!(!gate.is_held());
        assert_eq!(stream.sentence_count(), None);
        drop(stream);
        assert_eq!(model.cache_releases(), 0);
    }

    #[test]
    fn test_chunk_indices_and_last_flag() {
        let (synth, model, gate) = streaming(GateScope::Stream);
        let chunks: Vec<AudioChunk> = synth
            .synthesize(StreamRequest::new(THREE, "EN-US"))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.is_last, i == 2);
            assert_eq!(chunk.sample_rate, 24000);
        }

        let tail = &chunks[2].samples;
        let speech = model.infer("And the third!", SpeakerId(0), 1.0).unwrap();
        assert_eq!(tail.len(), speech.len() + 1200);
        assert!(tail[speech.len()..].iter().all(|s| *s == 0.0));
        assert!(!gate.is_held());
        assert_eq!(model.cache_releases(), 1);
    }

    #[test]
    fn test_gate_held_between_pulls_in_stream_scope() {
        let (synth, _, gate) = streaming(GateScope::Stream);
        let mut stream = synth.synthesize(StreamRequest::new(THREE, "en-us"));
        stream.next().unwrap().unwrap();
        assert!(gate.try_acquire().is_none());

        stream.close();
        assert!(stream.is_finished());
        assert!(gate.try_acquire().is_some());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_gate_free_between_pulls_in_sentence_scope() {
        let (synth, _, gate) = streaming(GateScope::Sentence);
        let mut stream = synth.synthesize(StreamRequest::new(THREE, "en-us"));
        stream.next().unwrap().unwrap();
        assert!(gate.try_acquire().is_some());
        assert_eq!(stream.count(), 2);
    }

    #[test]
    fn test_drop_releases_gate_without_cache_release() {
        let (synth, model, gate) = streaming(GateScope::Stream);
        let mut stream = synth.synthesize(StreamRequest::new(THREE, "en-us"));
        stream.next().unwrap().unwrap();
        assert!(gate.is_held());
        drop(stream);
        assert!(!gate.is_held());
        assert_eq!(model.cache_releases(), 0);
    }

    #[test]
    fn test_unknown_voice_surfaces_on_first_pull_then_fuses() {
        let (synth, _, gate) = streaming(GateScope::Stream);
        let mut stream = synth.synthesize(StreamRequest::new(THREE, "nobody"));
        assert!(matches!(stream.next(), Some(Err(Error::UnknownVoice { .. }))));
        assert!(stream.next().is_none());
        assert!(!gate.is_held());
    }

    #[test]
    fn test_out_of_range_speed_rejected_before_inference() {
        let (synth, model, gate) = streaming(GateScope::Stream);
        for speed in [1e-30, 0.05, 50.0] {
            let mut stream = synth.synthesize(StreamRequest::new(THREE, "en-us").with_speed(speed));
            assert!(matches!(stream.next(), Some(Err(Error::InvalidArgument(_)))));
            assert!(stream.next().is_none());
        }
        assert!(!gate.is_held());
        assert_eq!(model.cache_releases(), 0);
    }

    #[test]
    fn test_slowest_speed_bounds_silence() {
        let (synth, model, _) = streaming(GateScope::Stream);
        let chunks: Vec<AudioChunk> = synth
            .synthesize(StreamRequest::new("Hi.", "en-us").with_speed(speech_core::MIN_SPEED))
            .collect::<Result<_>>()
            .unwrap();

        let speech = model.expected_len("Hi.", speech_core::MIN_SPEED);
        assert_eq!(chunks[0].samples.len(), speech + 12000);
    }

    #[test]
    fn test_sample_rate_override() {
        let (synth, model, _) = streaming(GateScope::Stream);
        let chunks: Vec<AudioChunk> = synth
            .synthesize(StreamRequest::new("Hello world.", "en-us").with_sample_rate(16000))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 1);
        let speech = model.expected_len("Hello world.", 1.0);
        let resampled = crate::resample::output_len(speech, 24000, 16000);
        assert_eq!(chunks[0].sample_rate, 16000);
        assert_eq!(chunks[0].samples.len(), resampled + 800);
    }
}
