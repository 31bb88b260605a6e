//! Synthesis metrics
//!
//! Recorded through the `metrics` facade; the server installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};

/// Batch or stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Batch,
    Stream,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Batch => "batch",
            Mode::Stream => "stream",
        }
    }
}

/// Register series so they show up before the first request
pub fn describe() {
    for mode in [Mode::Batch, Mode::Stream] {
        counter!("speech_requests_total", "mode" => mode.as_str()).absolute(0);
    }
    counter!("speech_chunks_total").absolute(0);
}

pub fn record_request(mode: Mode) {
    counter!("speech_requests_total", "mode" => mode.as_str()).increment(1);
}

pub fn record_error(kind: &'static str) {
    counter!("speech_errors_total", "kind" => kind).increment(1);
}

pub fn record_chunk() {
    counter!("speech_chunks_total").increment(1);
}

pub fn record_synthesis_duration(mode: Mode, duration_secs: f64) {
    histogram!("speech_synthesis_duration_seconds", "mode" => mode.as_str()).record(duration_secs);
}

pub fn record_gate_wait(duration_secs: f64) {
    histogram!("speech_gate_wait_seconds").record(duration_secs);
}
