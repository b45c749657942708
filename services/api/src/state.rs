use interview_core::speech::{SpeakerFactory, SpeechInput};
use interview_core::{Interviewer, SessionStore};
use std::sync::Arc;

/// Shared handles every handler receives.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub interviewer: Arc<dyn Interviewer>,
    pub listener: Arc<dyn SpeechInput>,
    pub speakers: Arc<dyn SpeakerFactory>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        interviewer: Arc<dyn Interviewer>,
        listener: Arc<dyn SpeechInput>,
        speakers: Arc<dyn SpeakerFactory>,
    ) -> Self {
        Self {
            store,
            interviewer,
            listener,
            speakers,
        }
    }
}
