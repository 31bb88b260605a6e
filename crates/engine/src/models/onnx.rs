//! VITS-style model exported to ONNX
//!
//! A model directory holds:
//! - `model.onnx`    inputs x, x_lengths, tones, sid, sdp_ratio,
//!   noise_scale, length_scale, noise_scale_w; output y
//! - `tokens.txt`    one `symbol id` pair per line
//! - `speakers.json` speaker name → id
//!
//! The front-end is a plain symbol lookup over the sentence characters.

use ndarray::{Array1, Array2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use speech_config::ModelSpec;
use speech_core::{Error, Language, Result, SpeakerId};
use std::collections::HashMap;
use std::path::Path;

use crate::model::{InferenceParams, ModelHandle};
use speech_config::constants::audio::MODEL_SAMPLE_RATE;

const BLANK_ID: i64 = 0;

pub struct OnnxModel {
    language: Language,
    sample_rate: u32,
    session: Session,
    symbols: HashMap<char, i64>,
    speakers: Vec<(String, SpeakerId)>,
    params: InferenceParams,
}

impl OnnxModel {
    /// Load a model directory
    pub fn load(language: Language, spec: &ModelSpec, device: &str) -> Result<Self> {
        let dir = Path::new(&spec.path);

        if !matches!(device, "auto" | "cpu") {
            tracing::warn!(%language, device, "Only CPU execution is built in, running on CPU");
        }

        let session = Session::builder()
            .map_err(|e| Error::Config(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Config(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e| Error::Config(e.to_string()))?
            .commit_from_file(dir.join("model.onnx"))
            .map_err(|e| Error::Config(format!("{}: {}", dir.display(), e)))?;

        let symbols = load_symbols(&dir.join("tokens.txt"))?;
        let speakers = load_speakers(&dir.join("speakers.json"))?;

        tracing::info!(
            %language,
            path = %dir.display(),
            symbols = symbols.len(),
            speakers = speakers.len(),
            "Loaded ONNX speech model"
        );

        Ok(Self {
            language,
            sample_rate: spec.sample_rate.unwrap_or(MODEL_SAMPLE_RATE),
            session,
            symbols,
            speakers,
            params: InferenceParams::default(),
        })
    }

    fn token_ids(&self, sentence: &str) -> Vec<i64> {
        let mut ids = vec![BLANK_ID];
        for c in sentence.chars() {
            match self.symbols.get(&c) {
                Some(&id) => {
                    ids.push(id);
                    ids.push(BLANK_ID);
                }
                None => tracing::trace!(symbol = %c, "Skipping symbol missing from vocabulary"),
            }
        }
        ids
    }
}

fn load_symbols(path: &Path) -> Result<HashMap<char, i64>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    let mut symbols = HashMap::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        // The symbol itself may be a space, so split on the last one.
        let (symbol, id) = line
            .rsplit_once(' ')
            .ok_or_else(|| Error::Config(format!("{}:{}: expected `symbol id`", path.display(), line_no + 1)))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{}:{}: bad id", path.display(), line_no + 1)))?;

        let mut chars = symbol.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            symbols.insert(c, id);
        }
    }

    Ok(symbols)
}

fn load_speakers(path: &Path) -> Result<Vec<(String, SpeakerId)>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    let table: HashMap<String, u32> = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    let mut speakers: Vec<(String, SpeakerId)> = table
        .into_iter()
        .map(|(name, id)| (name, SpeakerId(id)))
        .collect();
    speakers.sort_by_key(|(name, id)| (id.0, name.clone()));
    Ok(speakers)
}

impl ModelHandle for OnnxModel {
    fn language(&self) -> Language {
        self.language
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speakers(&self) -> Vec<(String, SpeakerId)> {
        self.speakers.clone()
    }

    fn infer(&self, sentence: &str, speaker: SpeakerId, speed: f32) -> Result<Vec<f32>> {
        let ids = self.token_ids(sentence);
        if ids.len() <= 1 {
            return Err(Error::inference(format!("no known symbols in {:?}", sentence)));
        }
        let len = ids.len();

        let x = Array2::from_shape_vec((1, len), ids).map_err(|e| Error::inference(e.to_string()))?;
        let tones = Array2::<i64>::zeros((1, len));
        let x_lengths = Array1::from_vec(vec![len as i64]);
        let sid = Array1::from_vec(vec![speaker.0 as i64]);
        let sdp_ratio = Array1::from_vec(vec![self.params.sdp_ratio]);
        let noise_scale = Array1::from_vec(vec![self.params.noise_scale]);
        let length_scale = Array1::from_vec(vec![InferenceParams::length_scale(speed)]);
        let noise_scale_w = Array1::from_vec(vec![self.params.noise_scale_w]);

        let outputs = self
            .session
            .run(
                ort::inputs![
                    "x" => x.view(),
                    "x_lengths" => x_lengths.view(),
                    "tones" => tones.view(),
                    "sid" => sid.view(),
                    "sdp_ratio" => sdp_ratio.view(),
                    "noise_scale" => noise_scale.view(),
                    "length_scale" => length_scale.view(),
                    "noise_scale_w" => noise_scale_w.view(),
                ]
                .map_err(|e| Error::inference(e.to_string()))?,
            )
            .map_err(|e| Error::inference(e.to_string()))?;

        let audio = outputs
            .get("y")
            .ok_or_else(|| Error::inference("model produced no `y` output"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::inference(e.to_string()))?;

        Ok(audio.view().iter().copied().collect())
    }
}
