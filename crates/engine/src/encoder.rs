//! Audio container encoding
//!
//! Mono float waveforms in, container bytes out. WAV, raw PCM and FLAC are
//! always available; MP3 needs the `mp3` feature. OGG is recognised but has
//! no encoder.

use speech_core::{AudioFormat, Error, Result};
use std::io::Cursor;

/// Mono float waveform → container bytes
pub struct AudioEncoder;

impl AudioEncoder {
    /// Encode samples in [-1, 1] at `sample_rate` into `format`
    pub fn encode(samples: &[f32], sample_rate: u32, format: AudioFormat) -> Result<Vec<u8>> {
        if sample_rate == 0 {
            return Err(Error::Encoding("sample rate must be positive".to_string()));
        }
        if samples.is_empty() {
            return Err(Error::Encoding("cannot encode an empty waveform".to_string()));
        }

        let pcm = to_pcm16(samples);
        match format {
            AudioFormat::Wav => encode_wav(&pcm, sample_rate),
            AudioFormat::Pcm => Ok(encode_pcm(&pcm)),
            AudioFormat::Flac => encode_flac(&pcm, sample_rate),
            AudioFormat::Mp3 => encode_mp3(&pcm, sample_rate),
            AudioFormat::Ogg => Err(unsupported(format)),
        }
    }

    /// Whether an encoder for `format` is compiled in
    pub fn is_supported(format: AudioFormat) -> bool {
        match format {
            AudioFormat::Wav | AudioFormat::Pcm | AudioFormat::Flac => true,
            AudioFormat::Mp3 => cfg!(feature = "mp3"),
            AudioFormat::Ogg => false,
        }
    }

    pub fn supported_formats() -> Vec<AudioFormat> {
        AudioFormat::ALL
            .iter()
            .copied()
            .filter(|f| Self::is_supported(*f))
            .collect()
    }

    /// Fail fast when `format` cannot be produced
    pub fn ensure_supported(format: AudioFormat) -> Result<()> {
        if Self::is_supported(format) {
            Ok(())
        } else {
            Err(unsupported(format))
        }
    }
}

fn unsupported(format: AudioFormat) -> Error {
    Error::UnsupportedFormat(format!("no encoder available for {}", format))
}

/// Clamp to [-1, 1] and quantize to 16 bits
fn to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = if s.is_finite() { s.clamp(-1.0, 1.0) } else { 0.0 };
            (s * 32767.0).round() as i16
        })
        .collect()
}

fn encode_wav(pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + pcm.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
        for &sample in pcm {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }

    Ok(cursor.into_inner())
}

fn wav_error(e: hound::Error) -> Error {
    Error::Encoding(format!("wav: {}", e))
}

fn encode_pcm(pcm: &[i16]) -> Vec<u8> {
    pcm.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn encode_flac(pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    use flacenc::component::BitRepr;
    use flacenc::error::Verify;

    let config = flacenc::config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| Error::Encoding(format!("flac config: {:?}", e)))?;

    let samples: Vec<i32> = pcm.iter().map(|&s| s as i32).collect();
    let source = flacenc::source::MemSource::from_samples(&samples, 1, 16, sample_rate as usize);

    let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| Error::Encoding(format!("flac: {:?}", e)))?;

    let mut sink = flacenc::bitsink::ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| Error::Encoding(format!("flac: {:?}", e)))?;

    Ok(sink.as_slice().to_vec())
}

#[cfg(feature = "mp3")]
fn encode_mp3(pcm: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, MonoPcm, Quality};

    let mut builder = Builder::new().ok_or_else(|| Error::Encoding("mp3: LAME unavailable".to_string()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;
    builder
        .set_brate(Bitrate::Kbps128)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;

    let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(pcm.len()) + 7200);
    encoder
        .encode_to_vec(MonoPcm(pcm), &mut out)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| Error::Encoding(format!("mp3: {:?}", e)))?;

    Ok(out)
}

#[cfg(not(feature = "mp3"))]
fn encode_mp3(_pcm: &[i16], _sample_rate: u32) -> Result<Vec<u8>> {
    Err(unsupported(AudioFormat::Mp3))
}
