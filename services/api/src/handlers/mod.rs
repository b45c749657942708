pub mod interview;
pub mod meta;
pub mod speech;

use crate::error::ApiError;
use crate::state::AppState;
use interview_core::SessionHandle;

pub use interview::{
    complete_interview, conversational_response, get_question, save_answer, start_interview,
};
pub use meta::{catalog_handler, health_handler, not_found};
pub use speech::{record_answer, speak, stop_speech};

async fn find_session(state: &AppState, session_id: Option<&str>) -> Result<SessionHandle, ApiError> {
    let Some(id) = session_id else {
        return Err(ApiError::SessionNotFound);
    };
    state.store.get(id).await.ok_or_else(|| {
        tracing::debug!(session = %id, "unknown session");
        ApiError::SessionNotFound
    })
}
