use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::router::{Action, SessionState};

/// Live sessions keyed by the session id carried in access tokens.
///
/// Handlers take a snapshot, work on it and store the result back; two
/// requests racing on the same session resolve as last write wins.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(&self, state: SessionState) -> Uuid {
        let sid = Uuid::new_v4();
        self.sessions.write().await.insert(sid, state);
        sid
    }

    /// Current state, or a fresh logged-out one for unknown ids.
    pub async fn snapshot(&self, sid: Uuid) -> SessionState {
        self.sessions
            .read()
            .await
            .get(&sid)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn contains(&self, sid: Uuid) -> bool {
        self.sessions.read().await.contains_key(&sid)
    }

    /// Runs `f` on the open session under the write lock. `None` when the
    /// session no longer exists.
    pub async fn update<R>(&self, sid: Uuid, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let mut sessions = self.sessions.write().await;
        let state = sessions.get_mut(&sid)?;
        let out = f(state);
        if !state.is_authenticated() {
            sessions.remove(&sid);
        }
        Some(out)
    }

    /// Applies `action` atomically. Unknown sessions are not created.
    pub async fn apply(&self, sid: Uuid, action: Action) -> SessionState {
        let mut sessions = self.sessions.write().await;
        let Some(current) = sessions.remove(&sid) else {
            return SessionState::default();
        };
        let next = current.apply(action);
        if next.is_authenticated() {
            sessions.insert(sid, next.clone());
        }
        next
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
