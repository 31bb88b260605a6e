//! gRPC service behaviour, called through the generated trait

use speech_config::Settings;
use speech_engine::{SpeechEngine, Synthesizer};
use speech_server::proto::text_to_speech_server::TextToSpeech;
use speech_server::proto::{ListVoicesRequest, SynthesizeRequest};
use speech_server::TtsService;
use std::io::Cursor;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tonic::{Code, Request};

fn service() -> (TtsService, Arc<SpeechEngine>) {
    let engine = Arc::new(SpeechEngine::from_settings(&Settings::default()).unwrap());
    let synthesizer: Arc<dyn Synthesizer> = engine.clone();
    (TtsService::new(synthesizer), engine)
}

fn request(text: &str, voice: &str, speed: f32) -> Request<SynthesizeRequest> {
    Request::new(SynthesizeRequest {
        text: text.to_string(),
        voice: voice.to_string(),
        speed,
    })
}

#[tokio::test]
async fn list_voices_reports_name_and_language() {
    let (service, _) = service();
    let voices = service
        .list_voices(Request::new(ListVoicesRequest {}))
        .await
        .unwrap()
        .into_inner()
        .voices;

    assert_eq!(voices.len(), 6);
    assert_eq!(voices[0].name, "en-us");
    assert_eq!(voices[0].language, "EN");
    assert_eq!(voices[5].name, "zh");
    assert_eq!(voices[5].language, "ZH");
}

#[tokio::test]
async fn stream_yields_ordered_wav_chunks() {
    let (service, engine) = service();
    let stream = service
        .synthesize_speech_stream(request("First one. Second one. Third one.", "EN-US", 1.0))
        .await
        .unwrap()
        .into_inner();

    let chunks: Vec<_> = stream.collect::<Result<Vec<_>, _>>().await.unwrap();
    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i as i32);
        assert_eq!(chunk.is_last, i == 2);
        assert_eq!(chunk.sample_rate, 44100);

        let reader = hound::WavReader::new(Cursor::new(chunk.audio_data.clone())).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert!(reader.len() > 2205);
    }

    assert!(!engine.gate().is_held());
}

#[tokio::test]
async fn proto_defaults_apply_for_voice_and_speed() {
    let (service, _) = service();
    let stream = service
        .synthesize_speech_stream(request("Hello world.", "", 0.0))
        .await
        .unwrap()
        .into_inner();

    let chunks: Vec<_> = stream.collect::<Result<Vec<_>, _>>().await.unwrap();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_last);
}

#[tokio::test]
async fn empty_text_is_invalid_argument() {
    let (service, _) = service();
    let status = service
        .synthesize_speech_stream(request("   ", "en-us", 1.0))
        .await
        .err()
        .unwrap();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(status.message(), "text is required");
}

#[tokio::test]
async fn unknown_voice_is_invalid_argument() {
    let (service, engine) = service();
    let status = service
        .synthesize_speech_stream(request("Hello.", "klingon", 1.0))
        .await
        .err()
        .unwrap();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("klingon"));
    assert!(status.message().contains("en-us"));
    assert!(!engine.gate().is_held());
}

#[tokio::test]
async fn dropping_the_stream_releases_the_gate() {
    let (service, engine) = service();
    let mut stream = service
        .synthesize_speech_stream(request("One. Two. Three. Four. Five.", "en-us", 1.0))
        .await
        .unwrap()
        .into_inner();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.chunk_index, 0);
    drop(stream);

    // The producer notices the closed channel on its next send.
    let mut released = false;
    for _ in 0..200 {
        if !engine.gate().is_held() {
            released = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(released);
}

#[tokio::test]
async fn out_of_range_speed_is_invalid_argument() {
    let (service, engine) = service();
    let status = service
        .synthesize_speech_stream(request("Hello.", "en-us", 1e-30))
        .await
        .err()
        .unwrap();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().contains("speed"));
    assert!(!engine.gate().is_held());
}
