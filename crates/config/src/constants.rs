//! Centralized constants for the speech server
//!
//! Single source of truth for default values shared by the settings
//! defaults, the engine and the transports.

/// Network defaults
pub mod network {
    /// HTTP listener port
    pub const HTTP_PORT: u16 = 8080;

    /// gRPC listener port (0 disables the listener)
    pub const GRPC_PORT: u16 = 50051;

    /// Bind address
    pub const HOST: &str = "0.0.0.0";

    /// Request timeout for HTTP handlers (seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 120;
}

/// Model listing defaults for the OpenAI-compatible surface
pub mod model_listing {
    pub const MODEL_ID: &str = "melo-tts";
    pub const OWNED_BY: &str = "melotts";
}

/// Audio defaults
pub mod audio {
    /// Native rate of the bundled model family (Hz)
    pub const MODEL_SAMPLE_RATE: u32 = 44100;

    /// Silence appended after each streamed sentence at speed 1.0 (ms)
    pub const SENTENCE_SILENCE_MS: u32 = 50;

    /// Upper bound for configurable silence (ms)
    pub const MAX_SENTENCE_SILENCE_MS: u32 = 2000;
}

/// Inference parameters passed to VITS-style models
pub mod inference {
    pub const SDP_RATIO: f32 = 0.2;
    pub const NOISE_SCALE: f32 = 0.6;
    pub const NOISE_SCALE_W: f32 = 0.8;
}

/// Text segmentation limits
pub mod text {
    /// Sentences longer than this are split at clause or word boundaries
    pub const MAX_SENTENCE_CHARS: usize = 512;
}
