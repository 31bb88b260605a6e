//! gRPC transport
//!
//! `SynthesizeSpeechStream` drives a synthesis stream on a blocking thread
//! and forwards one WAV chunk per sentence through a channel of capacity 1,
//! so synthesis runs at the client's pace. When the client disconnects the
//! send fails, the stream is dropped and the synthesis gate is released.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use speech_core::{AudioFormat, StreamRequest, DEFAULT_SPEED};
use speech_engine::{AudioEncoder, Synthesizer};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::ServerError;

pub mod proto {
    tonic::include_proto!("tts");
}

use proto::text_to_speech_server::{TextToSpeech, TextToSpeechServer};

type AudioStream = Pin<Box<dyn Stream<Item = Result<proto::AudioChunk, Status>> + Send>>;

/// TextToSpeech service implementation
#[derive(Clone)]
pub struct TtsService {
    synthesizer: Arc<dyn Synthesizer>,
}

impl TtsService {
    pub fn new(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self { synthesizer }
    }

    pub fn into_server(self) -> TextToSpeechServer<Self> {
        TextToSpeechServer::new(self)
    }

    /// Apply proto3 defaults: empty voice and zero speed mean "unset"
    fn stream_request(&self, request: proto::SynthesizeRequest) -> Result<StreamRequest, Status> {
        if request.text.trim().is_empty() {
            return Err(Status::invalid_argument("text is required"));
        }

        let voice = if request.voice.is_empty() {
            self.synthesizer.default_voice().to_string()
        } else {
            request.voice
        };
        let speed = if request.speed == 0.0 {
            DEFAULT_SPEED
        } else {
            request.speed
        };

        Ok(StreamRequest::new(request.text, voice).with_speed(speed))
    }
}

fn encode_chunk(chunk: speech_core::AudioChunk) -> speech_core::Result<proto::AudioChunk> {
    let audio_data = AudioEncoder::encode(&chunk.samples, chunk.sample_rate, AudioFormat::Wav)?;
    Ok(proto::AudioChunk {
        audio_data,
        sample_rate: chunk.sample_rate as i32,
        chunk_index: chunk.index as i32,
        is_last: chunk.is_last,
    })
}

#[tonic::async_trait]
impl TextToSpeech for TtsService {
    type SynthesizeSpeechStreamStream = AudioStream;

    async fn synthesize_speech_stream(
        &self,
        request: Request<proto::SynthesizeRequest>,
    ) -> Result<Response<Self::SynthesizeSpeechStreamStream>, Status> {
        let request = self.stream_request(request.into_inner())?;
        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, voice = %request.voice, speed = request.speed, "gRPC stream requested");

        let (tx, mut rx) = mpsc::channel::<Result<proto::AudioChunk, Status>>(1);
        let synthesizer = self.synthesizer.clone();

        tokio::task::spawn_blocking(move || {
            for item in synthesizer.synthesize_stream(request) {
                let message = item
                    .and_then(encode_chunk)
                    .map_err(|e| Status::from(ServerError::from(e)));
                let failed = message.is_err();

                if tx.blocking_send(message).is_err() {
                    tracing::debug!(%request_id, "gRPC client disconnected, stopping synthesis");
                    return;
                }
                if failed {
                    return;
                }
            }
        });

        // Errors before the first chunk fail the call itself.
        let first = rx
            .recv()
            .await
            .ok_or_else(|| Status::internal("synthesis produced no audio"))??;

        let output: AudioStream = Box::pin(tokio_stream::once(Ok(first)).chain(ReceiverStream::new(rx)));
        Ok(Response::new(output))
    }

    async fn list_voices(
        &self,
        _request: Request<proto::ListVoicesRequest>,
    ) -> Result<Response<proto::VoiceList>, Status> {
        let voices = self
            .synthesizer
            .voice_infos()
            .into_iter()
            .map(|info| proto::Voice {
                name: info.name,
                language: info.language.code().to_string(),
            })
            .collect();

        Ok(Response::new(proto::VoiceList { voices }))
    }
}
