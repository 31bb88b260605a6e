//! Model backends and the loading factory

mod stub;
#[cfg(feature = "onnx")]
mod onnx;

pub use stub::StubModel;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;

use speech_config::{ModelBackend, ModelSpec};
use speech_core::{Language, Result};
use std::sync::Arc;

use crate::model::ModelHandle;

/// Load the model for one language
///
/// Requesting the ONNX backend from a build without the `onnx` feature
/// falls back to the stub with a warning.
pub fn load_model(language: Language, spec: &ModelSpec, device: &str) -> Result<Arc<dyn ModelHandle>> {
    match spec.backend {
        ModelBackend::Stub => {
            tracing::warn!(%language, "Using stub speech model - output is a synthetic tone");
            Ok(Arc::new(stub_model(language, spec)))
        }

        ModelBackend::Onnx => {
            #[cfg(feature = "onnx")]
            {
                Ok(Arc::new(OnnxModel::load(language, spec, device)?))
            }

            #[cfg(not(feature = "onnx"))]
            {
                let _ = device;
                tracing::warn!(%language, path = %spec.path, "ONNX model requested but onnx feature not enabled, using stub");
                Ok(Arc::new(stub_model(language, spec)))
            }
        }
    }
}

fn stub_model(language: Language, spec: &ModelSpec) -> StubModel {
    match spec.sample_rate {
        Some(rate) => StubModel::new(language).with_sample_rate(rate),
        None => StubModel::new(language),
    }
}
