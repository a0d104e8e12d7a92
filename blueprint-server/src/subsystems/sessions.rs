//! In-memory session store.
//!
//! The map lock is only held long enough to look up, insert or remove a
//! handle. Each session sits behind its own async mutex, which callers hold
//! across the completion call so turns on one session never interleave.

use blueprint_core::models::{ChatMessage, Session};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use uuid::Uuid;

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, SessionHandle>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a session from a seeded history and return its id.
    pub fn create(
        &self,
        idea: impl Into<String>,
        email: impl Into<String>,
        history: Vec<ChatMessage>,
    ) -> Uuid {
        self.insert(Session::new(idea, email, history))
    }

    pub fn insert(&self, session: Session) -> Uuid {
        let id = session.id;
        self.write().insert(id, Arc::new(Mutex::new(session)));
        tracing::debug!(session_id = %id, "Session created");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.read().get(id).cloned()
    }

    /// Run `mutator` under the session lock. `None` if the id is unknown.
    pub async fn update<F, R>(&self, id: &Uuid, mutator: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let handle = self.get(id)?;
        let mut session = handle.lock().await;
        Some(mutator(&mut session))
    }

    pub fn remove(&self, id: &Uuid) -> Option<SessionHandle> {
        let removed = self.write().remove(id);
        if removed.is_some() {
            tracing::debug!(session_id = %id, "Session removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Drop sessions idle for longer than `ttl`, plus any finalized leftovers.
    /// Sessions locked by an in-flight request are left alone. Evicted
    /// sessions are flagged finalized so a caller still holding the handle
    /// sees them as gone.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.write();
        let before = sessions.len();

        sessions.retain(|_, handle| match handle.try_lock() {
            Ok(mut session) => {
                if session.finalized || session.is_expired(now, ttl) {
                    session.finalized = true;
                    false
                } else {
                    true
                }
            }
            Err(_) => true,
        });

        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(reply: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("sys"),
            ChatMessage::user("idea"),
            ChatMessage::assistant(reply),
        ]
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let id = store.create("bakery site", "a@b.com", history("draft"));
        assert_eq!(store.len(), 1);

        let handle = store.get(&id).expect("session should exist");
        {
            let session = handle.lock().await;
            assert_eq!(session.requester_email, "a@b.com");
            assert_eq!(session.original_idea, "bakery site");
            assert_eq!(session.current_blueprint, "draft");
        }

        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = SessionStore::new();
        let a = store.create("a", "a@b.com", history("x"));
        let b = store.create("a", "a@b.com", history("x"));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_applies_mutator() {
        let store = SessionStore::new();
        let id = store.create("idea", "a@b.com", history("v1"));

        let len = store
            .update(&id, |s| {
                s.push_user("more");
                s.record_reply("v2");
                s.conversation_history.len()
            })
            .await;
        assert_eq!(len, Some(5));

        let blueprint = store.update(&id, |s| s.current_blueprint.clone()).await;
        assert_eq!(blueprint.as_deref(), Some("v2"));

        assert!(store.update(&Uuid::new_v4(), |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_evicts_only_idle_unlocked_sessions() {
        let store = SessionStore::new();
        let fresh = store.create("fresh", "a@b.com", history("x"));
        let stale = store.create("stale", "a@b.com", history("x"));
        let busy = store.create("busy", "a@b.com", history("x"));

        for id in [&stale, &busy] {
            store
                .update(id, |s| s.last_active_at = Utc::now() - Duration::hours(5))
                .await;
        }

        let busy_handle = store.get(&busy).unwrap();
        let _guard = busy_handle.lock().await;

        let evicted = store.sweep_expired(Duration::hours(1));
        assert_eq!(evicted, 1);
        assert!(store.get(&fresh).is_some());
        assert!(store.get(&stale).is_none());
        assert!(store.get(&busy).is_some());
    }

    #[tokio::test]
    async fn test_swept_session_is_finalized_for_outstanding_handles() {
        let store = SessionStore::new();
        let id = store.create("idea", "a@b.com", history("x"));
        store
            .update(&id, |s| s.last_active_at = Utc::now() - Duration::hours(5))
            .await;

        let outstanding = store.get(&id).unwrap();
        assert_eq!(store.sweep_expired(Duration::hours(1)), 1);
        assert!(store.get(&id).is_none());
        assert!(outstanding.lock().await.finalized);
    }

    #[tokio::test]
    async fn test_sweep_drops_finalized_sessions() {
        let store = SessionStore::new();
        let id = store.create("idea", "a@b.com", history("x"));
        store.update(&id, |s| s.finalized = true).await;

        assert_eq!(store.sweep_expired(Duration::hours(1)), 1);
        assert!(store.is_empty());
    }
}
