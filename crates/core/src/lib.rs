//! Core types for the speech server
//!
//! Shared by the engine, configuration and transport crates:
//! - Language codes and speaker identities
//! - Audio chunks and container formats
//! - Synthesis requests
//! - The error taxonomy every transport maps from

pub mod audio;
pub mod error;
pub mod language;
pub mod request;

pub use audio::{AudioChunk, AudioFormat};
pub use error::{Error, Result};
pub use language::{Language, SpeakerId};
pub use request::{
    StreamRequest, SynthesisRequest, VoiceInfo, DEFAULT_SPEED, DEFAULT_VOICE, MAX_SPEED, MIN_SPEED,
};
