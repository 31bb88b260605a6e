//! Synthesis entry point shared by all transports

use speech_config::{EngineSettings, Settings};
use speech_core::{AudioChunk, Error, Language, Result, StreamRequest, SynthesisRequest, VoiceInfo};
use std::sync::Arc;

use crate::batch::BatchSynthesizer;
use crate::gate::SynthesisGate;
use crate::models::load_model;
use crate::registry::VoiceRegistry;
use crate::stream::{StreamingSynthesizer, SynthesisStream};

/// Boxed chunk stream handed to transports
pub type ChunkStream = Box<dyn Iterator<Item = Result<AudioChunk>> + Send>;

/// Synthesis interface used by the RPC, HTTP and UI transports
///
/// All methods block; async callers run them on a blocking thread.
pub trait Synthesizer: Send + Sync {
    /// Voice keys in registration order
    fn voices(&self) -> Vec<String>;

    fn voice_infos(&self) -> Vec<VoiceInfo>;

    /// Configured languages in configuration order
    fn languages(&self) -> Vec<Language>;

    /// Voice keys for one configured language
    fn speakers(&self, language: Language) -> Result<Vec<String>>;

    /// Voice used when a request names none
    fn default_voice(&self) -> &str;

    /// Look up a voice key without synthesizing
    fn resolve_voice(&self, voice: &str) -> Result<VoiceInfo>;

    fn synthesize_batch(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;

    fn synthesize_stream(&self, request: StreamRequest) -> ChunkStream;
}

/// Registry, gate and both synthesizers wired together
pub struct SpeechEngine {
    registry: Arc<VoiceRegistry>,
    gate: SynthesisGate,
    batch: BatchSynthesizer,
    streaming: StreamingSynthesizer,
    settings: EngineSettings,
}

impl SpeechEngine {
    pub fn new(registry: Arc<VoiceRegistry>, settings: EngineSettings) -> Self {
        let gate = SynthesisGate::new();
        let batch = BatchSynthesizer::new(registry.clone(), gate.clone());
        let streaming = StreamingSynthesizer::new(
            registry.clone(),
            gate.clone(),
            settings.silence_secs(),
            settings.stream_gate_scope,
        );

        Self {
            registry,
            gate,
            batch,
            streaming,
            settings,
        }
    }

    /// Load every configured language's model and build the engine
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let engine = &settings.engine;
        let registry = VoiceRegistry::init(&engine.languages, |language| {
            load_model(language, &settings.model_spec(language), &engine.device)
        })?;

        if let Err(e) = registry.resolve(&engine.default_voice) {
            return Err(Error::Config(format!("engine.default_voice: {}", e)));
        }

        tracing::info!(
            languages = ?registry.languages(),
            voices = registry.len(),
            gate_scope = ?engine.stream_gate_scope,
            "Speech engine ready"
        );

        Ok(Self::new(Arc::new(registry), engine.clone()))
    }

    pub fn registry(&self) -> &Arc<VoiceRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &SynthesisGate {
        &self.gate
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Concrete stream, for callers that need `close()`
    pub fn stream(&self, request: StreamRequest) -> SynthesisStream {
        self.streaming.synthesize(request)
    }
}

impl Synthesizer for SpeechEngine {
    fn voices(&self) -> Vec<String> {
        self.registry.voices()
    }

    fn voice_infos(&self) -> Vec<VoiceInfo> {
        self.registry.voice_infos()
    }

    fn languages(&self) -> Vec<Language> {
        self.registry.languages().to_vec()
    }

    fn speakers(&self, language: Language) -> Result<Vec<String>> {
        self.registry.model(language)?;
        Ok(self.registry.speakers(language))
    }

    fn default_voice(&self) -> &str {
        &self.settings.default_voice
    }

    fn resolve_voice(&self, voice: &str) -> Result<VoiceInfo> {
        let resolved = self.registry.resolve(voice)?;
        Ok(VoiceInfo {
            name: resolved.key,
            language: resolved.language,
        })
    }

    fn synthesize_batch(&self, request: &SynthesisRequest) -> Result<Vec<u8>> {
        self.batch.synthesize(request)
    }

    fn synthesize_stream(&self, request: StreamRequest) -> ChunkStream {
        Box::new(self.streaming.synthesize(request))
    }
}

impl std::fmt::Debug for SpeechEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechEngine")
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish()
    }
}
