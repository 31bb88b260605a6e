//! End-to-end engine behaviour over stub and scripted models

use speech_config::{EngineSettings, GateScope};
use speech_core::{
    AudioChunk, AudioFormat, Error, Language, Result, SpeakerId, StreamRequest, SynthesisRequest,
};
use speech_engine::{ModelHandle, SpeechEngine, StubModel, Synthesizer, VoiceRegistry};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Inferences in flight, shared by every model of one engine
#[derive(Default)]
struct Concurrency {
    active: AtomicUsize,
    max_active: AtomicUsize,
}

/// Model whose inference fails on sentences containing "boom", returns no
/// samples for sentences containing "hush", and records how many inferences
/// run at once
struct ScriptedModel {
    inner: StubModel,
    concurrency: Arc<Concurrency>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self::for_language(Language::En, Arc::default())
    }

    fn for_language(language: Language, concurrency: Arc<Concurrency>) -> Self {
        Self {
            inner: StubModel::new(language).with_sample_rate(24000),
            concurrency,
        }
    }
}

impl ModelHandle for ScriptedModel {
    fn language(&self) -> Language {
        self.inner.language()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn speakers(&self) -> Vec<(String, SpeakerId)> {
        self.inner.speakers()
    }

    fn infer(&self, sentence: &str, speaker: SpeakerId, speed: f32) -> Result<Vec<f32>> {
        let now = self.concurrency.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.concurrency.max_active.fetch_max(now, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(2));
        let result = if sentence.contains("boom") {
            Err(Error::inference("model exploded"))
        } else if sentence.contains("hush") {
            Ok(Vec::new())
        } else {
            self.inner.infer(sentence, speaker, speed)
        };
        self.concurrency.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn release_cache(&self) {
        self.inner.release_cache();
    }
}

fn engine_with(model: Arc<dyn ModelHandle>, scope: GateScope) -> SpeechEngine {
    let zh: Arc<dyn ModelHandle> = Arc::new(StubModel::new(Language::Zh));
    let registry = VoiceRegistry::from_models([(Language::En, model), (Language::Zh, zh)]).unwrap();
    let settings = EngineSettings {
        stream_gate_scope: scope,
        ..EngineSettings::default()
    };
    SpeechEngine::new(Arc::new(registry), settings)
}

fn stub_engine() -> SpeechEngine {
    engine_with(Arc::new(StubModel::new(Language::En).with_sample_rate(24000)), GateScope::Stream)
}

fn decode_flac(bytes: Vec<u8>) -> (u32, usize) {
    use symphonia::core::codecs::DecoderOptions;
    use symphonia::core::formats::FormatOptions;
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;
    use symphonia::core::probe::Hint;

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("flac");

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .unwrap();
    let mut format = probed.format;
    let track = format.default_track().unwrap().clone();
    let sample_rate = track.codec_params.sample_rate.unwrap();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .unwrap();

    let mut frames = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() != track.id {
                    continue;
                }
                frames += decoder.decode(&packet).unwrap().frames();
            }
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => panic!("decode failed: {}", e),
        }
    }

    (sample_rate, frames)
}

#[test]
fn hello_world_decodes_at_model_rate() {
    let engine = stub_engine();
    let bytes = engine
        .synthesize_batch(&SynthesisRequest::new("Hello world.", "EN-US"))
        .unwrap();
    assert!(!bytes.is_empty());

    let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.spec().sample_rate, 24000);
    assert!(reader.len() > 0);
}

#[test]
fn flac_output_decodes_with_requested_rate() {
    let engine = stub_engine();
    let request = SynthesisRequest::new("Hello world. This is lossless.", "en-au").with_format(AudioFormat::Flac);
    let bytes = engine.synthesize_batch(&request).unwrap();
    assert_eq!(&bytes[0..4], b"fLaC");

    let model = StubModel::new(Language::En).with_sample_rate(24000);
    let expected = model.expected_len("Hello world.", 1.0) + model.expected_len("This is lossless.", 1.0);

    let (sample_rate, frames) = decode_flac(bytes);
    assert_eq!(sample_rate, 24000);
    assert_eq!(frames, expected);
}

#[test]
fn unknown_voice_fails_in_both_paths() {
    let engine = stub_engine();
    let available = engine.voices();

    match engine.synthesize_batch(&SynthesisRequest::new("Hello.", "nobody")) {
        Err(Error::UnknownVoice { voice, available: listed }) => {
            assert_eq!(voice, "nobody");
            assert_eq!(listed, available);
        }
        other => panic!("expected UnknownVoice, got {:?}", other.map(|b| b.len())),
    }

    let mut stream = engine.synthesize_stream(StreamRequest::new("Hello.", "nobody"));
    match stream.next() {
        Some(Err(Error::UnknownVoice { available: listed, .. })) => assert_eq!(listed, available),
        other => panic!("expected UnknownVoice, got {:?}", other.map(|r| r.map(|c| c.index))),
    }
}

#[test]
fn empty_text_fails_in_both_paths() {
    let engine = stub_engine();
    assert!(matches!(
        engine.synthesize_batch(&SynthesisRequest::new("", "en-us")),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.synthesize_stream(StreamRequest::new("", "en-us")).next(),
        Some(Err(Error::InvalidArgument(_)))
    ));
}

#[test]
fn doubling_speed_halves_silence() {
    let engine = stub_engine();
    let model = StubModel::new(Language::En).with_sample_rate(24000);
    let text = "Quick test.";

    let silence = |speed: f32| {
        let chunks: Vec<AudioChunk> = engine
            .synthesize_stream(StreamRequest::new(text, "en-us").with_speed(speed))
            .collect::<Result<_>>()
            .unwrap();
        chunks[0].samples.len() - model.expected_len(text, speed)
    };

    assert_eq!(silence(1.0), 1200);
    assert_eq!(silence(2.0), 600);
}

#[test]
fn concurrent_batches_across_voices_match_sequential_results() {
    let concurrency = Arc::new(Concurrency::default());
    let en: Arc<dyn ModelHandle> = Arc::new(ScriptedModel::for_language(Language::En, concurrency.clone()));
    let zh: Arc<dyn ModelHandle> = Arc::new(ScriptedModel::for_language(Language::Zh, concurrency.clone()));
    let registry = VoiceRegistry::from_models([(Language::En, en), (Language::Zh, zh)]).unwrap();
    let engine = Arc::new(SpeechEngine::new(Arc::new(registry), EngineSettings::default()));

    let requests = [
        ("en-us", "One sentence. Another sentence."),
        ("en-br", "A completely different text. With two parts."),
        ("en-au", "Yet another request. It has. Three sentences."),
        ("zh", "你好。今天天气很好。"),
        ("EN_INDIA", "Short."),
    ];
    let sequential: Vec<Vec<u8>> = requests
        .iter()
        .map(|(voice, text)| engine.synthesize_batch(&SynthesisRequest::new(*text, *voice)).unwrap())
        .collect();
    assert_eq!(concurrency.max_active.load(Ordering::SeqCst), 1);

    let handles: Vec<_> = requests
        .iter()
        .map(|(voice, text)| {
            let engine = engine.clone();
            let request = SynthesisRequest::new(*text, *voice);
            thread::spawn(move || engine.synthesize_batch(&request).unwrap())
        })
        .collect();

    for (handle, expected) in handles.into_iter().zip(sequential) {
        assert_eq!(handle.join().unwrap(), expected);
    }
    assert_eq!(concurrency.max_active.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_model_output_is_a_server_error() {
    let engine = engine_with(Arc::new(ScriptedModel::new()), GateScope::Stream);
    let err = engine
        .synthesize_batch(&SynthesisRequest::new("Please hush.", "en-us"))
        .unwrap_err();

    assert!(matches!(err, Error::Encoding(_)));
    assert!(!err.is_client_error());
    assert!(!engine.gate().is_held());
}

#[test]
fn stream_blocks_batch_until_dropped() {
    let engine = Arc::new(stub_engine());
    let mut stream = engine.stream(StreamRequest::new("One. Two. Three.", "en-us"));
    stream.next().unwrap().unwrap();
    assert!(engine.gate().is_held());

    let worker = {
        let engine = engine.clone();
        thread::spawn(move || engine.synthesize_batch(&SynthesisRequest::new("Waiting.", "en-us")))
    };

    thread::sleep(std::time::Duration::from_millis(50));
    assert!(!worker.is_finished());

    drop(stream);
    assert!(worker.join().unwrap().is_ok());
    assert!(!engine.gate().is_held());
}

#[test]
fn inference_error_ends_stream_and_releases_gate() {
    let model = Arc::new(ScriptedModel::new());
    let engine = engine_with(model.clone(), GateScope::Stream);

    let results: Vec<Result<AudioChunk>> = engine
        .synthesize_stream(StreamRequest::new("Fine. Then boom. Never reached.", "en-us"))
        .collect();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().index, 0);
    assert!(matches!(results[1], Err(Error::InferenceFailure(_))));
    assert!(!engine.gate().is_held());
    assert_eq!(model.inner.cache_releases(), 0);
}

#[test]
fn batch_failure_returns_no_partial_audio() {
    let model = Arc::new(ScriptedModel::new());
    let engine = engine_with(model.clone(), GateScope::Stream);

    let result = engine.synthesize_batch(&SynthesisRequest::new("Fine. Then boom.", "en-us"));
    assert!(matches!(result, Err(Error::InferenceFailure(_))));
    assert!(!engine.gate().is_held());
}

#[test]
fn streams_serialize_in_stream_scope_and_interleave_in_sentence_scope() {
    for (scope, expect_blocked) in [(GateScope::Stream, true), (GateScope::Sentence, false)] {
        let engine = engine_with(Arc::new(StubModel::new(Language::En)), scope);
        let mut first = engine.stream(StreamRequest::new("One. Two. Three.", "en-us"));
        first.next().unwrap().unwrap();
        assert_eq!(engine.gate().try_acquire().is_none(), expect_blocked, "{:?}", scope);
        first.close();
        assert!(!engine.gate().is_held());
    }
}

#[test]
fn identical_streams_are_deterministic() {
    let engine = stub_engine();
    let run = || -> Vec<AudioChunk> {
        engine
            .synthesize_stream(StreamRequest::new("Same text. Same voice.", "en-br"))
            .collect::<Result<_>>()
            .unwrap()
    };
    assert_eq!(run(), run());
}
