use super::transcription::{TranscriptionEngine, TranscriptionError};
use anyhow::Context;
use async_trait::async_trait;
use interview_core::speech::{ListenOutcome, SpeechInput};
use interview_native_utils::capture::{CaptureError, UtteranceCapture};
use std::sync::Arc;

/// Records one answer from the microphone and sends it for transcription.
pub struct MicrophoneListener {
    capture: UtteranceCapture,
    engine: Arc<dyn TranscriptionEngine>,
}

impl MicrophoneListener {
    pub fn new(input_device: Option<String>, engine: Arc<dyn TranscriptionEngine>) -> Self {
        Self {
            capture: UtteranceCapture::new(input_device),
            engine,
        }
    }
}

#[async_trait]
impl SpeechInput for MicrophoneListener {
    async fn listen_once(&self) -> anyhow::Result<ListenOutcome> {
        let capture = self.capture.clone();
        let recorded = tokio::task::spawn_blocking(move || capture.capture_wav())
            .await
            .context("Microphone capture task failed")?;

        let wav = match recorded {
            Ok(wav) => wav,
            Err(CaptureError::DeviceUnavailable(reason)) => {
                tracing::warn!("Microphone unavailable: {reason}");
                return Ok(ListenOutcome::DeviceUnavailable(reason));
            }
            Err(e) => return Err(e).context("Microphone capture failed"),
        };

        Ok(outcome(self.engine.transcribe(&wav).await))
    }
}

fn outcome(transcript: Result<String, TranscriptionError>) -> ListenOutcome {
    match transcript {
        Ok(text) if text.trim().is_empty() => ListenOutcome::Unintelligible,
        Ok(text) => ListenOutcome::Transcribed(text.trim().to_string()),
        Err(e) => {
            tracing::error!("Transcription failed: {e}");
            ListenOutcome::ServiceError(e.to_string())
        }
    }
}
