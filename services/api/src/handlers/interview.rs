use super::find_session;
use crate::error::{ApiError, Empty, Envelope, NO_SESSION_ID};
use crate::extract::{self, JsonBody, LenientJson};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use interview_core::session::DEFAULT_DURATION_MINUTES;
use interview_core::{InterviewSession, Report, SessionEntry, catalog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "extract::key")]
    pub experience: Option<String>,
    #[serde(default, deserialize_with = "extract::positive_number")]
    pub duration_minutes: Option<u32>,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub candidate_name: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub role_name: &'static str,
    pub experience_name: &'static str,
    pub intro_text: String,
    pub duration_minutes: u32,
}

#[tracing::instrument(skip_all)]
pub async fn start_interview(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<StartRequest>,
) -> Result<Json<Envelope<StartResponse>>, ApiError> {
    let role_key = request.role.as_deref().unwrap_or(catalog::DEFAULT_ROLE_KEY);
    let experience_key = request
        .experience
        .as_deref()
        .unwrap_or(catalog::DEFAULT_EXPERIENCE_KEY);

    let role = catalog::role(role_key)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {role_key}")))?;
    let experience = catalog::experience_level(experience_key)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown experience level: {experience_key}")))?;

    let session = InterviewSession::new(
        role,
        experience,
        &request.candidate_name,
        request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
    );
    let response = StartResponse {
        session_id: session.id.clone(),
        role_name: role.name,
        experience_name: experience.name,
        intro_text: session.intro_text(),
        duration_minutes: session.duration_minutes,
    };

    let speaker = state.speakers.create(&session.id);
    state.store.insert(SessionEntry::new(session, speaker)).await;
    tracing::info!(
        session = %response.session_id,
        role = role.name,
        experience = experience.name,
        "interview started"
    );

    Ok(Envelope::ok(response))
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub asked_questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    pub question_number: u32,
}

#[tracing::instrument(skip_all)]
pub async fn get_question(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<QuestionRequest>,
) -> Result<Json<Envelope<QuestionResponse>>, ApiError> {
    let entry = find_session(&state, request.session_id.as_deref()).await?;
    let mut session = entry.session.lock().await;

    let (question_number, question) = session
        .next_question(state.interviewer.as_ref(), request.asked_questions)
        .await;
    tracing::info!(session = %entry.id, question_number, "question ready");

    Ok(Envelope::ok(QuestionResponse {
        question,
        question_number,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub answer: String,
    #[serde(default, deserialize_with = "extract::positive_number")]
    pub question_num: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub response: String,
}

#[tracing::instrument(skip_all)]
pub async fn conversational_response(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<FeedbackRequest>,
) -> Result<Json<Envelope<FeedbackResponse>>, ApiError> {
    let entry = find_session(&state, request.session_id.as_deref()).await?;
    let session = entry.session.lock().await;

    let response = session
        .conversational_response(
            state.interviewer.as_ref(),
            &request.answer,
            request.question_num.unwrap_or(1),
        )
        .await;

    Ok(Envelope::ok(FeedbackResponse { response }))
}

#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub question: String,
    #[serde(default, deserialize_with = "extract::null_as_default")]
    pub answer: String,
}

#[tracing::instrument(skip_all)]
pub async fn save_answer(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SaveAnswerRequest>,
) -> Result<Json<Envelope<Empty>>, ApiError> {
    let entry = find_session(&state, request.session_id.as_deref()).await?;
    let mut session = entry.session.lock().await;
    session.record_answer(request.question, request.answer);
    tracing::debug!(session = %entry.id, saved = session.answers.len(), "answer saved");
    Ok(Envelope::done())
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default, deserialize_with = "extract::key")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub report: Report,
}

/// Evaluates every saved answer, then forgets the session.
#[tracing::instrument(skip_all)]
pub async fn complete_interview(
    State(state): State<AppState>,
    LenientJson(request): LenientJson<CompleteRequest>,
) -> Result<Json<Envelope<CompleteResponse>>, ApiError> {
    let Some(session_id) = request.session_id.filter(|id| !id.is_empty()) else {
        return Err(ApiError::BadRequest(NO_SESSION_ID.to_string()));
    };
    // Removed up front: requests arriving while the report is written see
    // "Session not found" instead of writing into a discarded session.
    let entry = state.store.remove(&session_id).await.ok_or_else(|| {
        tracing::debug!(session = %session_id, "unknown session");
        ApiError::SessionNotFound
    })?;

    let interviewer = Arc::clone(&state.interviewer);
    let reporting = Arc::clone(&entry);
    let report = tokio::spawn(async move {
        let session = reporting.session.lock().await;
        let report = session.build_report(interviewer.as_ref()).await;
        report
    })
    .await;

    // The speaker joins its playback thread when the last handle goes away.
    let _ = tokio::task::spawn_blocking(move || drop(entry)).await;

    let report = report.map_err(|e| {
        tracing::error!(session = %session_id, "report generation failed: {e}");
        ApiError::Internal("Unexpected error while generating report.".to_string())
    })?;
    tracing::info!(session = %session_id, "interview completed");

    Ok(Envelope::ok(CompleteResponse { report }))
}
