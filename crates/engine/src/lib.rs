//! Speech synthesis engine
//!
//! Features:
//! - Voice registry built once from per-language models
//! - Process-wide synthesis gate serializing all inference
//! - Batch synthesis to WAV, PCM, FLAC and (optionally) MP3
//! - Lazy sentence-by-sentence streaming with scoped gate ownership

pub mod batch;
pub mod encoder;
pub mod engine;
pub mod gate;
pub mod metrics;
pub mod model;
pub mod models;
pub mod registry;
pub mod resample;
pub mod segment;
pub mod stream;

pub use batch::BatchSynthesizer;
pub use encoder::AudioEncoder;
pub use engine::{ChunkStream, SpeechEngine, Synthesizer};
pub use gate::{GateGuard, SynthesisGate};
pub use model::{InferenceParams, ModelHandle};
pub use models::{load_model, StubModel};
pub use registry::{ResolvedVoice, VoiceRegistry};
pub use stream::{silence_samples, StreamingSynthesizer, SynthesisStream};

#[cfg(feature = "onnx")]
pub use models::OnnxModel;
