use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub const NO_DATA: &str = "No data provided";
pub const INVALID_BODY: &str = "Invalid request body";
pub const NO_SESSION_ID: &str = "No session_id provided";
pub const SESSION_NOT_FOUND: &str = "Session not found";
pub const ENDPOINT_NOT_FOUND: &str = "Endpoint not found";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Every response body: `{"success": true, ...payload}` or
/// `{"success": false, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: T,
}

/// Payload of endpoints that only report success.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T: Serialize> Envelope<T> {
    pub fn ok(payload: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            payload,
        })
    }
}

impl Envelope<Empty> {
    pub fn done() -> Json<Self> {
        Self::ok(Empty {})
    }

    pub fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: Some(message.into()),
            payload: Empty {},
        })
    }
}

/// Errors a handler can return. All render as a failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Session not found")]
    SessionNotFound,
    #[error("Endpoint not found")]
    EndpointNotFound,
    /// Logged where it happens; the client only sees the message.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::SessionNotFound | ApiError::EndpointNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Envelope::failure(self.to_string())).into_response()
    }
}
