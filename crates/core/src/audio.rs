//! Audio chunks and container formats

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// One unit of streamed audio: a sentence followed by trailing silence
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz, constant across one stream
    pub sample_rate: u32,
    /// Position of the sentence in the input
    pub index: usize,
    /// Set only on the chunk for the final sentence
    pub is_last: bool,
}

impl AudioChunk {
    /// Duration of the chunk in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Container format for encoded audio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// 16-bit PCM RIFF/WAVE
    #[default]
    Wav,
    /// Lossless FLAC
    Flac,
    /// MPEG layer III
    Mp3,
    /// Ogg container
    Ogg,
    /// Raw 16-bit little-endian samples
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Wav,
        AudioFormat::Flac,
        AudioFormat::Mp3,
        AudioFormat::Ogg,
        AudioFormat::Pcm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Pcm => "pcm",
        }
    }

    /// MIME type for HTTP responses
    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Pcm => "audio/pcm",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Pcm => "raw",
            other => other.as_str(),
        }
    }

    /// Uncompressed containers can carry per-chunk transport
    pub fn is_uncompressed(&self) -> bool {
        matches!(self, AudioFormat::Wav | AudioFormat::Pcm)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        AudioFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}
