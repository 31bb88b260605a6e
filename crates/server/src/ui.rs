//! Browser UI
//!
//! A single static page plus two JSON helpers. The page posts to
//! `/v1/audio/speech` like any other client.

use axum::{
    extract::{Path, State},
    response::Html,
    routing::get,
    Json, Router,
};
use speech_core::Language;

use crate::state::AppState;
use crate::ServerError;

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ui", get(index))
        .route("/ui/languages", get(languages))
        .route("/ui/languages/:lang/speakers", get(speakers))
}

/// Sample sentence shown when a language is selected
pub fn default_text(language: Language) -> &'static str {
    match language {
        Language::En => "The field of text-to-speech has seen rapid development recently.",
        Language::Zh => "text-to-speech 领域近年来发展迅速",
        Language::Es => "El campo de la síntesis de voz ha tenido un rápido desarrollo recientemente.",
        Language::Fr => "Le domaine de la synthèse vocale a connu un développement rapide récemment.",
        Language::Jp => "テキスト読み上げの分野は最近急速に発展しています。",
        Language::Kr => "최근 텍스트 음성 변환 분야가 빠르게 발전하고 있습니다.",
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn languages(State(state): State<AppState>) -> Json<serde_json::Value> {
    let languages: Vec<serde_json::Value> = state
        .synthesizer
        .languages()
        .into_iter()
        .map(|language| {
            serde_json::json!({
                "code": language.code(),
                "default_text": default_text(language),
            })
        })
        .collect();

    Json(serde_json::json!({ "languages": languages }))
}

async fn speakers(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let language: Language = lang.parse()?;
    let speakers = state.synthesizer.speakers(language)?;

    Ok(Json(serde_json::json!({
        "language": language.code(),
        "speakers": speakers,
        "default_text": default_text(language),
    })))
}
