//! Supported languages and speaker identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Languages a model can be configured for
///
/// The set is fixed at compile time; which of them are loaded is decided by
/// configuration and validated when the voice registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Language {
    En,
    Es,
    Fr,
    Zh,
    Jp,
    Kr,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::Zh,
        Language::Jp,
        Language::Kr,
    ];

    /// Upper-case language code
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Es => "ES",
            Language::Fr => "FR",
            Language::Zh => "ZH",
            Language::Jp => "JP",
            Language::Kr => "KR",
        }
    }

    /// Whether the language is written with ideographic or syllabic scripts
    pub fn is_cjk(&self) -> bool {
        matches!(self, Language::Zh | Language::Jp | Language::Kr)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| Error::InvalidArgument(format!("unsupported language: {}", s)))
    }
}

impl TryFrom<String> for Language {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

/// Opaque speaker identity understood by one model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeakerId(pub u32);

impl fmt::Display for SpeakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
