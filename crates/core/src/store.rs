use crate::session::InterviewSession;
use crate::speech::SpeechOutput;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A stored session together with the speaker it owns.
///
/// Each session has its own lock, so requests for one session run one at a
/// time while different sessions proceed independently.
pub struct SessionEntry {
    pub id: String,
    pub session: Mutex<InterviewSession>,
    pub speaker: Arc<dyn SpeechOutput>,
}

impl SessionEntry {
    pub fn new(session: InterviewSession, speaker: Arc<dyn SpeechOutput>) -> Self {
        Self {
            id: session.id.clone(),
            session: Mutex::new(session),
            speaker,
        }
    }
}

pub type SessionHandle = Arc<SessionEntry>;

/// Where sessions live between requests. Handlers only see this trait, so
/// the in-memory map can be swapped for a bounded or external store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, entry: SessionEntry) -> SessionHandle;
    async fn get(&self, id: &str) -> Option<SessionHandle>;
    async fn remove(&self, id: &str) -> Option<SessionHandle>;
    async fn len(&self) -> usize;
}

/// Process-local store. Sessions are never expired.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn insert(&self, entry: SessionEntry) -> SessionHandle {
        let handle = Arc::new(entry);
        let mut sessions = self.sessions.lock().await;
        if sessions
            .insert(handle.id.clone(), Arc::clone(&handle))
            .is_some()
        {
            tracing::warn!(session = %handle.id, "replaced an existing session");
        }
        tracing::debug!(session = %handle.id, active = sessions.len(), "session stored");
        handle
    }

    async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.lock().await.get(id).cloned()
    }

    async fn remove(&self, id: &str) -> Option<SessionHandle> {
        let removed = self.sessions.lock().await.remove(id);
        if removed.is_some() {
            tracing::debug!(session = %id, "session removed");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
