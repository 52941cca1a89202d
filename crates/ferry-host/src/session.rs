//! Session history: who said what, per engine, per session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for a conversation session.
pub type SessionId = String;

/// Originator of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventRole {
    /// The caller
    User,
    /// The app itself
    Agent,
    /// A tool invoked on the caller's behalf
    Tool,
}

/// One entry in a session's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Who produced this entry
    pub role: EventRole,
    /// What was said
    pub text: String,
    /// When it happened
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    /// An event stamped with the current time.
    pub fn now(role: EventRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// A session and everything recorded in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier
    pub session_id: SessionId,
    /// Caller the session belongs to, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// When the first event arrived
    pub created_at: DateTime<Utc>,
    /// Events in arrival order
    pub events: Vec<SessionEvent>,
}

/// Trait for recording and retrieving session histories.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append an event, creating the session on first write.
    async fn append_event(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
        event: SessionEvent,
    ) -> anyhow::Result<()>;

    /// Load one session's record.
    /// Returns None if nothing has been recorded under this ID.
    async fn session(&self, session_id: &SessionId) -> anyhow::Result<Option<SessionRecord>>;

    /// List all session IDs with recorded history, sorted.
    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionId>>;

    /// Delete a session's history.
    async fn delete_session(&self, session_id: &SessionId) -> anyhow::Result<()>;
}

/// In-memory session store for testing and single-process hosts.
/// History is not persisted between process restarts.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: std::sync::RwLock<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn append_event(
        &self,
        session_id: &SessionId,
        user_id: Option<&str>,
        event: SessionEvent,
    ) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory session store")
        })?;
        let record = sessions
            .entry(session_id.clone())
            .or_insert_with(|| SessionRecord {
                session_id: session_id.clone(),
                user_id: user_id.map(str::to_string),
                created_at: Utc::now(),
                events: Vec::new(),
            });
        record.events.push(event);
        tracing::debug!(session_id = %session_id, "Recorded session event");
        Ok(())
    }

    async fn session(&self, session_id: &SessionId) -> anyhow::Result<Option<SessionRecord>> {
        let sessions = self.sessions.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory session store")
        })?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn list_sessions(&self) -> anyhow::Result<Vec<SessionId>> {
        let sessions = self.sessions.read().map_err(|_| {
            anyhow::anyhow!("Failed to acquire read lock on in-memory session store")
        })?;
        let mut ids: Vec<_> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_session(&self, session_id: &SessionId) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| {
            anyhow::anyhow!("Failed to acquire write lock on in-memory session store")
        })?;
        sessions.remove(session_id);
        tracing::debug!(session_id = %session_id, "Deleted session from memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn append_and_load_keeps_order() {
        let store = InMemorySessionStore::new();
        let session_id = "s-1".to_string();

        store
            .append_event(
                &session_id,
                Some("user-7"),
                SessionEvent::now(EventRole::User, "call bq_execute_sql"),
            )
            .await
            .unwrap();
        store
            .append_event(
                &session_id,
                Some("user-7"),
                SessionEvent::now(EventRole::Tool, "2 rows"),
            )
            .await
            .unwrap();

        let record = store.session(&session_id).await.unwrap().unwrap();
        assert_eq!(record.user_id.as_deref(), Some("user-7"));
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].role, EventRole::User);
        assert_eq!(record.events[1].role, EventRole::Tool);
        assert_eq!(record.events[1].text, "2 rows");
    }

    #[tokio::test]
    async fn missing_session_loads_as_none() {
        let store = InMemorySessionStore::new();
        let loaded = store.session(&"nope".to_string()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn first_writer_pins_the_user() {
        let store = InMemorySessionStore::new();
        let session_id = "s-1".to_string();

        store
            .append_event(
                &session_id,
                Some("user-7"),
                SessionEvent::now(EventRole::User, "hello"),
            )
            .await
            .unwrap();
        store
            .append_event(
                &session_id,
                None,
                SessionEvent::now(EventRole::Agent, "hi"),
            )
            .await
            .unwrap();

        let record = store.session(&session_id).await.unwrap().unwrap();
        assert_eq!(record.user_id.as_deref(), Some("user-7"));
    }

    #[tokio::test]
    async fn list_is_sorted_and_delete_removes() {
        let store = InMemorySessionStore::new();
        for id in ["s-b", "s-a", "s-c"] {
            store
                .append_event(
                    &id.to_string(),
                    None,
                    SessionEvent::now(EventRole::User, "x"),
                )
                .await
                .unwrap();
        }

        assert_eq!(
            store.list_sessions().await.unwrap(),
            vec!["s-a".to_string(), "s-b".to_string(), "s-c".to_string()]
        );

        store.delete_session(&"s-b".to_string()).await.unwrap();
        assert_eq!(
            store.list_sessions().await.unwrap(),
            vec!["s-a".to_string(), "s-c".to_string()]
        );
        assert!(store.session(&"s-b".to_string()).await.unwrap().is_none());
    }
}
