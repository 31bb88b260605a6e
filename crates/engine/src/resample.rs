//! Sample-rate conversion for stream chunks
//!
//! Mono only. Uses a chunked FFT resampler and trims the filter delay so the
//! output length is exactly `ceil(len * to / from)`.

use rubato::{FftFixedIn, Resampler};
use speech_core::{Error, Result};

const CHUNK: usize = 1024;
const SUB_CHUNKS: usize = 2;

/// Expected output length for a conversion
pub fn output_len(input_len: usize, from: u32, to: u32) -> usize {
    (input_len as f64 * to as f64 / from as f64).ceil() as usize
}

/// Resample mono samples from `from` Hz to `to` Hz
pub fn resample_mono(input: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    if from == 0 || to == 0 {
        return Err(Error::Resample(format!("invalid rates {} -> {}", from, to)));
    }
    if from == to || input.is_empty() {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, CHUNK, SUB_CHUNKS, 1)
        .map_err(|e| Error::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = output_len(input.len(), from, to);
    let mut out = Vec::with_capacity(delay + expected + CHUNK);

    let mut pos = 0;
    let mut block = vec![vec![0.0f32; CHUNK]];
    while out.len() < delay + expected {
        let end = (pos + CHUNK).min(input.len());
        let filled = end.saturating_sub(pos);

        block[0].fill(0.0);
        if filled > 0 {
            block[0][..filled].copy_from_slice(&input[pos..end]);
        }

        let frames = resampler
            .process(&block, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += CHUNK;
    }

    out.drain(..delay);
    out.truncate(expected);
    Ok(out)
}
