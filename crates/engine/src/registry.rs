//! Voice registry
//!
//! Maps lower-cased voice keys to (language, speaker, model) bindings.
//! Built once at startup from a validated language→model table and shared
//! read-only afterwards.

use speech_core::{Error, Language, Result, SpeakerId, VoiceInfo};
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ModelHandle;

#[derive(Debug, Clone)]
struct VoiceEntry {
    key: String,
    language: Language,
    speaker: SpeakerId,
}

/// A voice key bound to its model and speaker
#[derive(Clone)]
pub struct ResolvedVoice {
    pub key: String,
    pub language: Language,
    pub speaker: SpeakerId,
    pub model: Arc<dyn ModelHandle>,
}

impl std::fmt::Debug for ResolvedVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedVoice")
            .field("key", &self.key)
            .field("language", &self.language)
            .field("speaker", &self.speaker)
            .field("sample_rate", &self.model.sample_rate())
            .finish()
    }
}

impl PartialEq for ResolvedVoice {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.language == other.language
            && self.speaker == other.speaker
            && Arc::ptr_eq(&self.model, &other.model)
    }
}

/// Immutable voice table
pub struct VoiceRegistry {
    languages: Vec<Language>,
    models: HashMap<Language, Arc<dyn ModelHandle>>,
    voices: Vec<VoiceEntry>,
    index: HashMap<String, usize>,
}

impl VoiceRegistry {
    /// Load one model per language and register every speaker
    ///
    /// Calling this again yields a fresh registry; nothing is appended to a
    /// previous one.
    pub fn init<F>(languages: &[Language], mut loader: F) -> Result<Self>
    where
        F: FnMut(Language) -> Result<Arc<dyn ModelHandle>>,
    {
        let mut table = Vec::with_capacity(languages.len());
        for &language in languages {
            let model = loader(language)?;
            table.push((language, model));
        }
        Self::from_models(table)
    }

    /// Build from an explicit language→model table
    pub fn from_models<I>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Language, Arc<dyn ModelHandle>)>,
    {
        let mut registry = Self {
            languages: Vec::new(),
            models: HashMap::new(),
            voices: Vec::new(),
            index: HashMap::new(),
        };

        for (language, model) in models {
            registry.register(language, model)?;
        }

        if registry.languages.is_empty() {
            return Err(Error::Config("no languages configured".to_string()));
        }

        tracing::info!(
            languages = ?registry.languages,
            voices = registry.voices.len(),
            "Voice registry initialized"
        );

        Ok(registry)
    }

    fn register(&mut self, language: Language, model: Arc<dyn ModelHandle>) -> Result<()> {
        if self.models.contains_key(&language) {
            return Err(Error::Config(format!("language {} configured twice", language)));
        }
        if model.language() != language {
            return Err(Error::Config(format!(
                "model for {} reports language {}",
                language,
                model.language()
            )));
        }
        if model.sample_rate() == 0 {
            return Err(Error::Config(format!("model for {} reports a zero sample rate", language)));
        }

        let speakers = model.speakers();
        if speakers.is_empty() {
            return Err(Error::Config(format!("model for {} has no speakers", language)));
        }

        for (name, speaker) in speakers {
            let key = name.to_lowercase();
            let entry = VoiceEntry {
                key: key.clone(),
                language,
                speaker,
            };

            match self.index.get(&key) {
                Some(&position) => {
                    let previous = &self.voices[position];
                    tracing::warn!(
                        voice = %key,
                        previous_language = %previous.language,
                        language = %language,
                        "Voice key registered twice, later binding wins"
                    );
                    self.voices[position] = entry;
                }
                None => {
                    self.index.insert(key, self.voices.len());
                    self.voices.push(entry);
                }
            }
        }

        self.languages.push(language);
        self.models.insert(language, model);
        Ok(())
    }

    /// Voice keys in registration order
    pub fn voices(&self) -> Vec<String> {
        self.voices.iter().map(|v| v.key.clone()).collect()
    }

    /// Voice keys with their languages, in registration order
    pub fn voice_infos(&self) -> Vec<VoiceInfo> {
        self.voices
            .iter()
            .map(|v| VoiceInfo {
                name: v.key.clone(),
                language: v.language,
            })
            .collect()
    }

    /// Look up a voice, case-insensitively
    pub fn resolve(&self, voice: &str) -> Result<ResolvedVoice> {
        let key = voice.to_lowercase();
        let entry = self
            .index
            .get(&key)
            .map(|&position| &self.voices[position])
            .ok_or_else(|| Error::UnknownVoice {
                voice: voice.to_string(),
                available: self.voices(),
            })?;

        let model = self.model(entry.language)?;
        Ok(ResolvedVoice {
            key: entry.key.clone(),
            language: entry.language,
            speaker: entry.speaker,
            model,
        })
    }

    /// Configured languages in configuration order
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Model for a configured language
    pub fn model(&self, language: Language) -> Result<Arc<dyn ModelHandle>> {
        self.models
            .get(&language)
            .cloned()
            .ok_or_else(|| Error::invalid_argument(format!("language {} not configured", language)))
    }

    /// Voice keys bound to one language
    pub fn speakers(&self, language: Language) -> Vec<String> {
        self.voices
            .iter()
            .filter(|v| v.language == language)
            .map(|v| v.key.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl std::fmt::Debug for VoiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceRegistry")
            .field("languages", &self.languages)
            .field("voices", &self.voices())
            .finish()
    }
}
