use super::find_session;
use crate::error::{ApiError, Empty, Envelope};
use crate::extract::{self, JsonBody, LenientJson};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use interview_core::speech::{ListenOutcome, SpeakMode};
use serde::{Deserialize, Serialize};

pub const UNINTELLIGIBLE: &str =
    "Sorry, I could not clearly understand your speech. Please try speaking again.";
pub const MICROPHONE_UNAVAILABLE: &str =
    "Microphone not available. Please check your input device and try again.";
pub const RECORDING_FAILED: &str = "Unexpected error while recording.";

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub text: String,
}

/// Speaks the text and returns once playback has finished.
#[tracing::instrument(skip_all)]
pub async fn speak(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SpeakRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let entry = find_session(&state, request.session_id.as_deref()).await?;
    let speaker = entry.speaker.clone();

    tokio::task::spawn_blocking(move || speaker.speak(&request.text, SpeakMode::Blocking))
        .await
        .map_err(|e| {
            tracing::error!(session = %entry.id, "speech task failed: {e}");
            ApiError::Internal(crate::error::INTERNAL_ERROR.to_string())
        })?;

    Ok(Envelope::done())
}

#[derive(Debug, Default, Deserialize)]
pub struct StopRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
}

/// Always succeeds, even for unknown sessions.
#[tracing::instrument(skip_all)]
pub async fn stop_speech(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<StopRequest>,
) -> Json<Envelope<Empty>> {
    if let Some(id) = request.session_id.as_deref() {
        if let Some(entry) = state.store.get(id).await {
            entry.speaker.stop();
        }
    }
    Envelope::done()
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub answer: String,
}

/// Listens for one spoken answer. Recognition problems are reported with
/// `success: false` and status 200 so the browser can offer a retry.
#[tracing::instrument(skip_all)]
pub async fn record_answer(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<RecordRequest>,
) -> Result<Response, ApiError> {
    let entry = find_session(&state, request.session_id.as_deref()).await?;

    let outcome = state.listener.listen_once().await.map_err(|e| {
        tracing::error!(session = %entry.id, "recording failed: {e:#}");
        ApiError::Internal(RECORDING_FAILED.to_string())
    })?;

    let response = match outcome {
        ListenOutcome::Transcribed(answer) => {
            tracing::info!(session = %entry.id, chars = answer.len(), "answer transcribed");
            Envelope::ok(RecordResponse { answer }).into_response()
        }
        ListenOutcome::Unintelligible => Envelope::failure(UNINTELLIGIBLE).into_response(),
        ListenOutcome::ServiceError(reason) => {
            Envelope::failure(format!("Speech recognition service error: {reason}")).into_response()
        }
        ListenOutcome::DeviceUnavailable(reason) => {
            tracing::warn!(session = %entry.id, "microphone unavailable: {reason}");
            Envelope::failure(MICROPHONE_UNAVAILABLE).into_response()
        }
    };
    Ok(response)
}
