//! Synthesis gate
//!
//! One process-wide mutual-exclusion lock taken around every inference call,
//! whatever the model or language. Acquisition is scoped: the gate is
//! released when the returned guard is dropped, on every exit path.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics;

#[derive(Default)]
struct GateState {
    held: Mutex<bool>,
    released: Condvar,
}

/// Shared mutual-exclusion resource for model execution
#[derive(Clone, Default)]
pub struct SynthesisGate {
    state: Arc<GateState>,
}

/// Proof of holding the gate; dropping it releases the gate
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    state: Arc<GateState>,
    acquired_at: Instant,
}

impl SynthesisGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the gate is free and take it
    pub fn acquire(&self) -> GateGuard {
        let started = Instant::now();
        {
            let mut held = self.state.held.lock();
            while *held {
                self.state.released.wait(&mut held);
            }
            *held = true;
        }
        let waited = started.elapsed();

        metrics::record_gate_wait(waited.as_secs_f64());
        if waited.as_millis() > 0 {
            tracing::debug!(wait_ms = waited.as_millis() as u64, "Synthesis gate acquired after waiting");
        }

        self.guard()
    }

    /// Take the gate only if nobody holds it
    pub fn try_acquire(&self) -> Option<GateGuard> {
        let mut held = self.state.held.lock();
        if *held {
            return None;
        }
        *held = true;
        drop(held);
        Some(self.guard())
    }

    /// Whether some caller currently holds the gate
    pub fn is_held(&self) -> bool {
        *self.state.held.lock()
    }

    fn guard(&self) -> GateGuard {
        GateGuard {
            state: self.state.clone(),
            acquired_at: Instant::now(),
        }
    }
}

impl GateGuard {
    /// How long this guard has held the gate
    pub fn held_ms(&self) -> u64 {
        self.acquired_at.elapsed().as_millis() as u64
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *self.state.held.lock() = false;
        self.state.released.notify_one();
    }
}

impl std::fmt::Debug for SynthesisGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisGate")
            .field("held", &self.is_held())
            .finish()
    }
}
