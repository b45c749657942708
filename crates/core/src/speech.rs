//! Speech adapter contracts.
//!
//! The concrete adapters live in the API service; the core only needs the
//! shape of the calls so a session can own a speaker and handlers can listen.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakMode {
    /// Return once playback has finished.
    Blocking,
    /// Return as soon as the utterance is queued.
    Detached,
}

/// Lifecycle of a speech output handle.
///
/// `Uninitialized -> Ready -> (Speaking <-> Ready) -> Stopped`; a speak
/// after a stop moves back to `Speaking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerState {
    Uninitialized,
    Ready,
    Speaking,
    Stopped,
}

/// Text-to-speech output. Implementations swallow and log their own
/// failures; nothing propagates to the caller.
///
/// `speak` with [`SpeakMode::Blocking`] blocks the calling thread, so async
/// callers should go through `spawn_blocking`.
pub trait SpeechOutput: Send + Sync {
    fn speak(&self, text: &str, mode: SpeakMode);
    fn stop(&self);
    fn state(&self) -> SpeakerState;
}

/// Creates the speech output owned by a new session.
pub trait SpeakerFactory: Send + Sync {
    fn create(&self, session_id: &str) -> Arc<dyn SpeechOutput>;
}

/// Result of one listening attempt. Only `Transcribed` carries an answer;
/// the rest are soft failures the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    Transcribed(String),
    Unintelligible,
    ServiceError(String),
    DeviceUnavailable(String),
}

#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Captures one utterance and transcribes it. `Err` is reserved for
    /// unexpected failures (a panicked capture thread, for instance).
    async fn listen_once(&self) -> Result<ListenOutcome>;
}

/// Speaker used when voice output is disabled: it tracks state and logs.
#[derive(Debug)]
pub struct SilentSpeaker {
    state: Mutex<SpeakerState>,
}

impl Default for SilentSpeaker {
    fn default() -> Self {
        Self {
            state: Mutex::new(SpeakerState::Uninitialized),
        }
    }
}

impl SilentSpeaker {
    fn set_state(&self, next: SpeakerState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

impl SpeechOutput for SilentSpeaker {
    fn speak(&self, text: &str, mode: SpeakMode) {
        tracing::info!(?mode, chars = text.len(), "voice disabled, not speaking");
        self.set_state(SpeakerState::Ready);
    }

    fn stop(&self) {
        self.set_state(SpeakerState::Stopped);
    }

    fn state(&self) -> SpeakerState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SilentSpeakerFactory;

impl SpeakerFactory for SilentSpeakerFactory {
    fn create(&self, _session_id: &str) -> Arc<dyn SpeechOutput> {
        Arc::new(SilentSpeaker::default())
    }
}

/// Listener used when voice input is disabled.
#[derive(Debug, Default)]
pub struct NoMicrophone;

#[async_trait]
impl SpeechInput for NoMicrophone {
    async fn listen_once(&self) -> Result<ListenOutcome> {
        Ok(ListenOutcome::DeviceUnavailable(
            "voice input is disabled".to_string(),
        ))
    }
}
