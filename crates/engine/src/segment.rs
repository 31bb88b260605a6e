//! Sentence segmentation and per-sentence text preparation
//!
//! Default segmentation used by `ModelHandle::segment`. Boundaries follow
//! Unicode sentence rules (UAX #29), which cover both Latin terminators and
//! full-width CJK punctuation.

use regex::Regex;
use speech_config::constants::text::MAX_SENTENCE_CHARS;
use speech_core::Language;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static CAMEL_CASE: OnceLock<Regex> = OnceLock::new();

/// Split text into ordered, trimmed sentences
///
/// Fragments without any letters or digits (stray punctuation) are attached
/// to the previous sentence. Sentences longer than `MAX_SENTENCE_CHARS`
/// are split further at clause or word boundaries.
pub fn split_sentences(text: &str, language: Language) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();

    for piece in text.unicode_sentences() {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }

        if !piece.chars().any(char::is_alphanumeric) {
            if let Some(last) = sentences.last_mut() {
                last.push_str(piece);
            }
            continue;
        }

        sentences.extend(split_long(piece, MAX_SENTENCE_CHARS, language));
    }

    sentences
}

/// Break an over-long sentence into pieces of at most `max_chars`
fn split_long(sentence: &str, max_chars: usize, language: Language) -> Vec<String> {
    let chars: Vec<char> = sentence.chars().collect();
    if chars.len() <= max_chars {
        return vec![sentence.to_string()];
    }

    let mut parts = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let mut cut = end;

        if end < chars.len() {
            if let Some(pos) = chars[start..end].iter().rposition(|c| is_soft_break(*c, language)) {
                if pos > 0 {
                    cut = start + pos + 1;
                }
            }
        }

        let part: String = chars[start..cut].iter().collect();
        let part = part.trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }
        start = cut;
    }

    parts
}

fn is_soft_break(c: char, language: Language) -> bool {
    match c {
        ',' | ';' | ':' | '，' | '、' | '；' | '：' => true,
        c if c.is_whitespace() => !language.is_cjk(),
        _ => false,
    }
}

/// Prepare one sentence for inference
///
/// English models read run-together identifiers better with a space at
/// lower-to-upper case transitions (`helloWorld` → `hello World`).
pub fn normalize_sentence(sentence: &str, language: Language) -> String {
    match language {
        Language::En => {
            let re = CAMEL_CASE.get_or_init(|| {
                Regex::new(r"([a-z])([A-Z])").expect("static regex is valid")
            });
            re.replace_all(sentence, "$1 $2").into_owned()
        }
        _ => sentence.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_latin_sentences_in_order() {
        let sentences = split_sentences(
            "Hello world. How are you today? I am fine!",
            Language::En,
        );
        assert_eq!(
            sentences,
            vec!["Hello world.", "How are you today?", "I am fine!"]
        );
    }

    #[test]
    fn test_splits_cjk_sentences() {
        let sentences = split_sentences("你好。今天天气很好！我们出去走走吧？", Language::Zh);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "你好。");
    }

    #[test]
    fn test_single_sentence_without_terminator() {
        assert_eq!(split_sentences("  Hello world  ", Language::En), vec!["Hello world"]);
    }

    #[test]
    fn test_punctuation_only_yields_nothing() {
        assert!(split_sentences("...", Language::En).is_empty());
        assert!(split_sentences("   ", Language::En).is_empty());
    }

    #[test]
    fn test_long_sentence_is_split_at_word_boundaries() {
        let sentence = "word ".repeat(300);
        let parts = split_sentences(&sentence, Language::En);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.chars().count() <= MAX_SENTENCE_CHARS);
            assert!(!part.starts_with(' '));
        }
        let rejoined: usize = parts.iter().map(|p| p.split_whitespace().count()).sum();
        assert_eq!(rejoined, 300);
    }

    #[test]
    fn test_camel_case_split_for_english_only() {
        assert_eq!(normalize_sentence("say helloWorld", Language::En), "say hello World");
        assert_eq!(normalize_sentence("helloWorld", Language::Fr), "helloWorld");
    }
}
