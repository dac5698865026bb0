//! Chat sessions and their store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::chat::ChatState;

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// One page lifetime of chat.
///
/// Cloning a session is cheap; clones share the same state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier.
    id: String,
    /// Chat state, single writer at a time.
    state: RwLock<ChatState>,
    /// Session creation time.
    created_at: DateTime<Utc>,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
    /// Number of the most recently completed turn.
    completed_turn: watch::Sender<u64>,
}

impl Session {
    fn new(id: String, state: ChatState) -> Self {
        let now = Utc::now();
        let (completed_turn, _) = watch::channel(0);
        Self {
            inner: Arc::new(SessionInner {
                id,
                state: RwLock::new(state),
                created_at: now,
                last_activity: RwLock::new(now),
                completed_turn,
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Read the chat state.
    pub fn read<R>(&self, f: impl FnOnce(&ChatState) -> R) -> R {
        let guard = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Apply a transition to the chat state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ChatState) -> R) -> R {
        let result = {
            let mut guard = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        };
        self.touch();
        result
    }

    /// Announce that `turn` has completed.
    pub fn mark_turn_complete(&self, turn: u64) {
        self.inner.completed_turn.send_if_modified(|done| {
            if turn > *done {
                *done = turn;
                true
            } else {
                false
            }
        });
    }

    /// Wait until `turn` has completed.
    pub async fn wait_for_turn(&self, turn: u64) {
        let mut rx = self.inner.completed_turn.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done >= turn).await;
    }

    /// Update the last activity timestamp.
    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match (Utc::now() - last).to_std() {
            Ok(idle) => idle > timeout,
            // Negative duration means clock skew.
            Err(_) => false,
        }
    }

    /// Session creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Get the session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        (Utc::now() - self.inner.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Thread-safe store for sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    page_size: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(20)
    }
}

impl SessionStore {
    /// Create a store whose sessions fetch `page_size` turns per history page.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                page_size,
            }),
        }
    }

    /// Create a session, optionally resuming a backend conversation.
    #[must_use]
    pub fn create(&self, conversation_id: Option<String>) -> Session {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(
            id.clone(),
            ChatState::new(conversation_id, self.inner.page_size),
        );
        self.sessions_mut().insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions().get(id).cloned()
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        self.sessions_mut().remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle longer than `timeout`. Sessions waiting on the
    /// backend are kept.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.sessions_mut();
        let before = guard.len();
        guard.retain(|_, session| {
            session.read(ChatState::is_typing) || !session.is_expired_with_timeout(timeout)
        });
        before - guard.len()
    }

    fn sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sessions_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.inner
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_store() {
        let store = SessionStore::new(10);
        assert!(store.is_empty());

        let session = store.create(None);
        assert_eq!(store.len(), 1);

        let retrieved = store.get(session.id()).unwrap();
        assert_eq!(retrieved.id(), session.id());

        store.remove(session.id());
        assert!(store.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::new(10);
        let session = store.create(None);
        let other = store.get(session.id()).unwrap();

        session.update(|s| s.begin_send("hello")).unwrap();
        assert!(other.read(ChatState::is_typing));
    }

    #[test]
    fn resumed_sessions_start_with_history_to_load() {
        let store = SessionStore::new(5);
        let session = store.create(Some("conv-9".to_string()));
        assert!(session.read(ChatState::needs_initial_load));
        assert_eq!(session.read(|s| s.conversation_id().map(str::to_owned)), Some("conv-9".to_string()));
    }

    #[test]
    fn cleanup_keeps_typing_sessions() {
        let store = SessionStore::new(10);
        let idle = store.create(None);
        let busy = store.create(None);
        busy.update(|s| s.begin_send("slow question")).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.cleanup_expired_with_timeout(Duration::ZERO), 1);
        assert!(store.get(idle.id()).is_none());
        assert!(store.get(busy.id()).is_some());
    }

    #[tokio::test]
    async fn waiting_for_a_completed_turn_returns_immediately() {
        let store = SessionStore::new(10);
        let session = store.create(None);
        session.mark_turn_complete(2);
        session.wait_for_turn(1).await;
        session.wait_for_turn(2).await;
    }

    #[tokio::test]
    async fn waiters_wake_on_completion() {
        let store = SessionStore::new(10);
        let session = store.create(None);
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_for_turn(1).await })
        };
        tokio::task::yield_now().await;
        session.mark_turn_complete(1);
        waiter.await.unwrap();
    }
}
