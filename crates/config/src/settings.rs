//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use speech_core::{Language, DEFAULT_VOICE};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::constants::{audio, model_listing, network};
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Transport configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Synthesis engine configuration
    #[serde(default)]
    pub engine: EngineSettings,

    /// Model source per language; languages without an entry use the stub backend
    #[serde(default)]
    pub models: BTreeMap<Language, ModelSpec>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Model spec for a language, falling back to the stub backend
    pub fn model_spec(&self, language: Language) -> ModelSpec {
        self.models.get(&language).cloned().unwrap_or_default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;

        if self.server.grpc_port != 0 && self.server.grpc_port == self.server.port {
            return Err(ConfigError::InvalidValue {
                field: "server.grpc_port".to_string(),
                message: format!("must differ from server.port ({})", self.server.port),
            });
        }

        for (language, spec) in &self.models {
            if spec.backend == ModelBackend::Onnx && spec.path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("models.{}.path", language),
                    message: "onnx backend requires a model directory".to_string(),
                });
            }
            if !self.engine.languages.contains(language) {
                tracing::warn!(%language, "Model configured for a language that is not enabled");
            }
        }

        Ok(())
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address shared by all listeners
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP listener port
    #[serde(default = "default_port")]
    pub port: u16,

    /// gRPC listener port, 0 disables it
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,

    /// Serve the browser UI under /ui
    #[serde(default = "default_true")]
    pub ui_enabled: bool,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Model id reported by /v1/models
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Owner reported by /v1/models
    #[serde(default = "default_model_owner")]
    pub model_owner: String,
}

fn default_host() -> String {
    network::HOST.to_string()
}
fn default_port() -> u16 {
    network::HTTP_PORT
}
fn default_grpc_port() -> u16 {
    network::GRPC_PORT
}
fn default_timeout() -> u64 {
    network::REQUEST_TIMEOUT_SECS
}
fn default_model_id() -> String {
    model_listing::MODEL_ID.to_string()
}
fn default_model_owner() -> String {
    model_listing::OWNED_BY.to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            grpc_port: default_grpc_port(),
            ui_enabled: true,
            cors_origins: Vec::new(),
            timeout_seconds: default_timeout(),
            model_id: default_model_id(),
            model_owner: default_model_owner(),
        }
    }
}

/// How long a stream holds the synthesis gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateScope {
    /// Acquire once, release when the stream is drained, closed or dropped
    #[default]
    Stream,
    /// Reacquire for every sentence
    Sentence,
}

/// Synthesis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Languages loaded at startup, in registration order
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,

    /// Execution device hint for model backends ("auto", "cpu", "cuda")
    #[serde(default = "default_device")]
    pub device: String,

    /// Silence appended after each streamed sentence at speed 1.0
    #[serde(default = "default_silence_ms")]
    pub silence_ms: u32,

    /// Gate scope for streaming synthesis
    #[serde(default)]
    pub stream_gate_scope: GateScope,

    /// Voice used by transports when a request names none
    #[serde(default = "default_voice")]
    pub default_voice: String,
}

fn default_languages() -> Vec<Language> {
    vec![Language::En, Language::Zh]
}
fn default_device() -> String {
    "auto".to_string()
}
fn default_silence_ms() -> u32 {
    audio::SENTENCE_SILENCE_MS
}
fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            device: default_device(),
            silence_ms: default_silence_ms(),
            stream_gate_scope: GateScope::default(),
            default_voice: default_voice(),
        }
    }
}

impl EngineSettings {
    /// Silence duration in seconds at speed 1.0
    pub fn silence_secs(&self) -> f64 {
        self.silence_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.languages".to_string(),
                message: "at least one language must be enabled".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for language in &self.languages {
            if !seen.insert(*language) {
                return Err(ConfigError::InvalidValue {
                    field: "engine.languages".to_string(),
                    message: format!("{} is listed more than once", language),
                });
            }
        }

        if self.silence_ms == 0 || self.silence_ms > audio::MAX_SENTENCE_SILENCE_MS {
            return Err(ConfigError::InvalidValue {
                field: "engine.silence_ms".to_string(),
                message: format!(
                    "must be between 1 and {} (got {})",
                    audio::MAX_SENTENCE_SILENCE_MS,
                    self.silence_ms
                ),
            });
        }

        if self.default_voice.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.default_voice".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Model implementation backing a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Deterministic tone generator, no model files needed
    #[default]
    Stub,
    /// Exported model run through ONNX Runtime
    Onnx,
}

/// Where a language's model comes from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub backend: ModelBackend,

    /// Model directory (model.onnx, tokens.txt, speakers.json)
    #[serde(default)]
    pub path: String,

    /// Override for the model's native sample rate
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable tracing export
    #[serde(default = "default_true")]
    pub tracing_enabled: bool,

    /// OTLP endpoint for traces
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            tracing_enabled: true,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

fn environment_source() -> Environment {
    Environment::with_prefix("SPEECH")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("engine.languages")
        .with_list_parse_key("server.cors_origins")
        .try_parsing(true)
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (SPEECH__ prefix, `__` separator)
/// 2. config/{env}.{toml,yaml,json} (if env specified)
/// 3. config/default.{toml,yaml,json}
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(environment_source());

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

/// Load settings from one explicit file plus environment overrides
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let settings: Settings = Config::builder()
        .add_source(File::from(path.as_ref()).required(true))
        .add_source(environment_source())
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}
