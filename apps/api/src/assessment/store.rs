use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::errors::AppError;

use super::models::Session;

/// In-memory session registry.
///
/// Each session is an independently mutable unit behind its own `RwLock`:
/// stage-advancing operations serialize on the write lock, status reads
/// share the read lock and observe a consistent snapshot. Durable
/// persistence across restarts is delegated to an external store; this
/// registry is the seam where one would plug in.
///
/// The store also tracks the countdown task armed for each session's code
/// stage so a client submission can cancel it.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<RwLock<Session>>>>,
    timers: Mutex<HashMap<Uuid, AbortHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a session and returns its shared handle.
    pub async fn insert(&self, session: Session) -> Arc<RwLock<Session>> {
        let id = session.session_id;
        let slot = Arc::new(RwLock::new(session));
        self.sessions.write().await.insert(id, slot.clone());
        slot
    }

    pub async fn get(&self, session_id: Uuid) -> Result<Arc<RwLock<Session>>, AppError> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(AppError::SessionNotFound(session_id))
    }

    /// Remembers the countdown task armed for a session's code stage,
    /// aborting any previously armed one.
    pub fn arm_timer(&self, session_id: Uuid, handle: AbortHandle) {
        let mut timers = self.timers.lock().expect("timer registry poisoned");
        if let Some(previous) = timers.insert(session_id, handle) {
            previous.abort();
        }
    }

    /// Stops and forgets a session's countdown. Safe to call when none is
    /// armed or when the task has already run to completion.
    pub fn disarm_timer(&self, session_id: Uuid) {
        let handle = {
            let mut timers = self.timers.lock().expect("timer registry poisoned");
            timers.remove(&session_id)
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
