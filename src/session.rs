use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::SessionStoreError;
use crate::records::model::ClientProcesses;

/// Every named state of the conversation. A session always holds exactly
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    Idle,
    AwaitingDocumentType,
    AwaitingDocumentNumber,
    LookupInProgress,
    ProcessSelection,
    ReportGenerate,
    ReportOptionsSuccess,
    ReportOptionsError,
}

/// A value captured during the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Processes(ClientProcesses),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        if let FieldValue::String(s) = self { Some(s) } else { None }
    }

    pub fn as_processes(&self) -> Option<&ClientProcesses> {
        if let FieldValue::Processes(p) = self { Some(p) } else { None }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s) => json!(s),
            FieldValue::Processes(p) => json!(p),
        }
    }
}

pub const FIELD_DOCUMENT_TYPE: &str = "document_type";
pub const FIELD_DOCUMENT_NUMBER: &str = "document_number";
pub const FIELD_PROCESSES: &str = "processes";

/// Per-user conversation state. Created lazily on the first inbound event,
/// mutated only by the flow engine after a step handler runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub current_step: StepId,
    fields: HashMap<String, FieldValue>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_step: StepId::Idle,
            fields: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn merge(&mut self, fields: Vec<(String, FieldValue)>) {
        for (key, value) in fields {
            self.fields.insert(key, value);
        }
    }

    pub fn fields(&self) -> &HashMap<String, FieldValue> {
        &self.fields
    }

    /// Back to `Idle` with no captured data; terminal actions end here.
    pub fn reset(&mut self) {
        self.current_step = StepId::Idle;
        self.fields.clear();
    }

    pub fn processes(&self) -> Option<&ClientProcesses> {
        self.get(FIELD_PROCESSES).and_then(FieldValue::as_processes)
    }

    pub fn document_number(&self) -> Option<&str> {
        self.get(FIELD_DOCUMENT_NUMBER).and_then(FieldValue::as_str)
    }
}

/// Keyed session persistence. Read once and written once per inbound
/// event; the engine serializes events per user, so no cross-user locking
/// happens here.
#[async_trait]
pub trait SessionStore: Send + Sync + Debug {
    /// Returns the user's session, creating an `Idle` one if absent.
    async fn get(&self, user_id: &str) -> Result<Session, SessionStoreError>;
    /// Replaces the user's session.
    async fn put(&self, session: Session) -> Result<(), SessionStoreError>;
    /// Explicitly drops a session.
    async fn remove(&self, user_id: &str);
}

/// TTL-backed in-memory store. Idle expiry is the eviction policy: an
/// expired session is recreated at `Idle` on the next inbound event.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    cache: Cache<String, Session>,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Arc<Self> {
        let cache = Cache::builder()
            .time_to_idle(ttl)
            .eviction_listener(|key: Arc<String>, _session, cause| {
                info!("session expired: user={}, cause={:?}", key, cause);
            })
            .build();
        Arc::new(Self { cache })
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &str) -> Result<Session, SessionStoreError> {
        Ok(self
            .cache
            .get(user_id)
            .await
            .unwrap_or_else(|| Session::new(user_id)))
    }

    async fn put(&self, session: Session) -> Result<(), SessionStoreError> {
        self.cache.insert(session.user_id.clone(), session).await;
        Ok(())
    }

    async fn remove(&self, user_id: &str) {
        self.cache.invalidate(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_user_gets_idle_session() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let session = store.get("5511999990000").await.unwrap();
        assert_eq!(session.current_step, StepId::Idle);
        assert!(session.fields().is_empty());
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.get("user-1").await.unwrap();
        session.current_step = StepId::AwaitingDocumentNumber;
        session.set(FIELD_DOCUMENT_TYPE, FieldValue::String("person".into()));
        store.put(session.clone()).await.unwrap();

        let loaded = store.get("user-1").await.unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn remove_resets_to_idle() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let mut session = store.get("user-2").await.unwrap();
        session.current_step = StepId::ProcessSelection;
        store.put(session).await.unwrap();

        store.remove("user-2").await;
        let fresh = store.get("user-2").await.unwrap();
        assert_eq!(fresh.current_step, StepId::Idle);
    }

    #[test]
    fn reset_clears_step_and_fields() {
        let mut session = Session::new("user-3");
        session.current_step = StepId::ReportOptionsSuccess;
        session.set(FIELD_DOCUMENT_NUMBER, FieldValue::String("1234567".into()));
        session.reset();
        assert_eq!(session.current_step, StepId::Idle);
        assert!(session.fields().is_empty());
    }
}
