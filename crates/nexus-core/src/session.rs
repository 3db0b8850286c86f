//! Conversation sessions for the agent runtime.
//!
//! Sessions are keyed by (application namespace, user, session id) and live
//! for the lifetime of the process. There is no removal or expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::error::SessionError;
use crate::runtime::Event;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }

    fn not_found(&self) -> SessionError {
        SessionError::NotFound {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
        }
    }

    fn already_exists(&self) -> SessionError {
        SessionError::AlreadyExists {
            app_name: self.app_name.clone(),
            user_id: self.user_id.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// One conversation thread and the events recorded in it.
#[derive(Debug, Clone)]
pub struct Session {
    pub key: SessionKey,
    pub events: Vec<Event>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// Fetch a snapshot of a session. Fails with [`SessionError::NotFound`]
    /// when it was never created.
    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError>;

    /// Create an empty session. Fails with [`SessionError::AlreadyExists`]
    /// when the key is taken.
    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError>;

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError>;
}

/// Fetch a session, creating it when the service reports it missing.
///
/// A concurrent creator winning the race is not an error; the session it
/// created is returned.
pub async fn get_or_create(
    service: &dyn SessionService,
    key: &SessionKey,
) -> Result<Session, SessionError> {
    match service.get_session(key).await {
        Err(SessionError::NotFound { .. }) => {}
        other => return other,
    }

    debug!(
        "Creating session {}/{}/{}",
        key.app_name, key.user_id, key.session_id
    );
    match service.create_session(key).await {
        Err(SessionError::AlreadyExists { .. }) => service.get_session(key).await,
        other => other,
    }
}

/// Process-local session storage.
#[derive(Default)]
pub struct InMemorySessionService {
    sessions: DashMap<SessionKey, Session>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn get_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        self.sessions
            .get(key)
            .map(|s| s.value().clone())
            .ok_or_else(|| key.not_found())
    }

    async fn create_session(&self, key: &SessionKey) -> Result<Session, SessionError> {
        match self.sessions.entry(key.clone()) {
            Entry::Occupied(_) => Err(key.already_exists()),
            Entry::Vacant(slot) => {
                let session = Session::new(key.clone());
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    async fn append_event(&self, key: &SessionKey, event: Event) -> Result<(), SessionError> {
        let mut session = self.sessions.get_mut(key).ok_or_else(|| key.not_found())?;
        session.events.push(event);
        session.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::runtime::{Content, EventKind};
    use crate::testing::CountingSessions;

    fn key(session_id: &str) -> SessionKey {
        SessionKey::new("zunery_nexus_a1", "user", session_id)
    }

    #[tokio::test]
    async fn get_missing_session_is_not_found() {
        let service = InMemorySessionService::new();
        let err = service.get_session(&key("s1")).await.unwrap_err();
        assert_eq!(err, key("s1").not_found());
    }

    #[tokio::test]
    async fn create_twice_is_rejected() {
        let service = InMemorySessionService::new();
        service.create_session(&key("s1")).await.unwrap();
        let err = service.create_session(&key("s1")).await.unwrap_err();
        assert!(matches!(err, SessionError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn get_or_create_creates_once() {
        let service = CountingSessions::new();

        get_or_create(&service, &key("s1")).await.unwrap();
        get_or_create(&service, &key("s1")).await.unwrap();
        get_or_create(&service, &key("s1")).await.unwrap();

        assert_eq!(service.creates(), 1);
        assert_eq!(service.gets(), 3);
        assert_eq!(service.inner.len(), 1);
    }

    #[tokio::test]
    async fn sessions_are_scoped_by_namespace() {
        let service = InMemorySessionService::new();
        let a = SessionKey::new("zunery_nexus_a1", "user", "default");
        let b = SessionKey::new("zunery_nexus_b2", "user", "default");

        get_or_create(&service, &a).await.unwrap();
        get_or_create(&service, &b).await.unwrap();
        assert_eq!(service.len(), 2);
    }

    #[tokio::test]
    async fn append_event_records_in_order() {
        let service = InMemorySessionService::new();
        service.create_session(&key("s1")).await.unwrap();
        service
            .append_event(
                &key("s1"),
                Event::new("user", EventKind::Input, Some(Content::user_text("one"))),
            )
            .await
            .unwrap();
        service
            .append_event(
                &key("s1"),
                Event::new("user", EventKind::Input, Some(Content::user_text("two"))),
            )
            .await
            .unwrap();

        let session = service.get_session(&key("s1")).await.unwrap();
        let texts: Vec<String> = session
            .events
            .iter()
            .filter_map(|e| e.content.as_ref().map(Content::text))
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn append_to_missing_session_fails() {
        let service = InMemorySessionService::new();
        let event = Event::new("user", EventKind::Input, None);
        assert!(service.append_event(&key("s1"), event).await.is_err());
    }
}
