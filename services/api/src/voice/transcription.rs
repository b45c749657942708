use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribes a WAV recording.
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<String, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("request failed: {0}")]
    ApiRequestFailed(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

pub struct OpenAiWhisperEngine {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl OpenAiWhisperEngine {
    pub fn new(
        api_key: SecretString,
        base_url: Option<String>,
        model: Option<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build transcription HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: model.unwrap_or_else(|| "whisper-1".to_string()),
        })
    }
}

impl OpenAiWhisperEngine {
    fn upload_form(&self, audio_wav: &[u8]) -> Result<multipart::Form, TranscriptionError> {
        let recording = multipart::Part::bytes(audio_wav.to_vec())
            .file_name("answer.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscriptionError::ApiRequestFailed(e.to_string()))?;
        Ok(multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", recording))
    }
}

/// Plain-text transcript, or the service's error body on a non-2xx status.
async fn transcript_text(response: reqwest::Response) -> Result<String, TranscriptionError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TranscriptionError::InvalidResponse(e.to_string()))?;
    if status.is_success() {
        Ok(body.trim().to_string())
    } else {
        Err(TranscriptionError::ApiRequestFailed(format!(
            "status {status}: {}",
            body.trim()
        )))
    }
}

#[async_trait]
impl TranscriptionEngine for OpenAiWhisperEngine {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<String, TranscriptionError> {
        let form = self.upload_form(audio_wav)?;
        tracing::debug!(model = %self.model, bytes = audio_wav.len(), "uploading answer audio");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(e.to_string()))?;

        let transcript = transcript_text(response).await?;
        tracing::info!(chars = transcript.len(), "answer transcribed");
        Ok(transcript)
    }
}
