//! Chat sessions: one conversation and the transcript store it owns.

use crate::config::{Settings, TranscriptProvider};
use crate::error::{HealthbotError, Result};
use crate::transcript::{
    MemoryTranscriptStore, SqliteTranscriptStore, TranscriptEntry, TranscriptStore,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A single conversation.
///
/// Submitting a message takes the session by `&mut`, so one session never runs
/// two turns at once.
pub struct ChatSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    store: Arc<dyn TranscriptStore>,
}

impl ChatSession {
    /// Wrap an existing store.
    pub fn with_store(id: Uuid, store: Arc<dyn TranscriptStore>) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            store,
        }
    }

    /// A fresh session with an in-memory transcript.
    pub fn in_memory() -> Self {
        Self::with_store(Uuid::new_v4(), Arc::new(MemoryTranscriptStore::new()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        &self.store
    }

    /// The full transcript, oldest entry first.
    pub async fn transcript(&self) -> Result<Vec<TranscriptEntry>> {
        self.store.all().await
    }
}

/// Start a new session on the configured transcript backend.
pub fn create_session(settings: &Settings) -> Result<ChatSession> {
    let id = Uuid::new_v4();
    let store: Arc<dyn TranscriptStore> = match settings.transcript.provider {
        TranscriptProvider::Memory => Arc::new(MemoryTranscriptStore::new()),
        TranscriptProvider::Sqlite => Arc::new(SqliteTranscriptStore::open(
            &settings.sqlite_path(),
            &id.to_string(),
        )?),
    };

    info!("Created session {}", id);
    Ok(ChatSession::with_store(id, store))
}

/// Reopen a stored session. Only the sqlite backend keeps sessions around.
pub fn open_session(settings: &Settings, id: &str) -> Result<ChatSession> {
    let uuid = Uuid::parse_str(id)
        .map_err(|_| HealthbotError::InvalidInput(format!("Invalid session id: {}", id)))?;

    match settings.transcript.provider {
        TranscriptProvider::Memory => Err(HealthbotError::SessionNotFound(format!(
            "{} (the memory transcript backend does not keep sessions)",
            id
        ))),
        TranscriptProvider::Sqlite => {
            let path = settings.sqlite_path();
            if !SqliteTranscriptStore::session_exists(&path, &uuid.to_string())? {
                return Err(HealthbotError::SessionNotFound(id.to_string()));
            }
            let store = SqliteTranscriptStore::open(&path, &uuid.to_string())?;
            info!("Resumed session {}", uuid);
            Ok(ChatSession::with_store(uuid, Arc::new(store)))
        }
    }
}

/// Drop every entry from the session's transcript.
pub async fn clear_session(session: &mut ChatSession) -> Result<()> {
    session.store.clear().await?;
    info!("Cleared session {}", session.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{AssistantTurn, TurnPart};

    fn sqlite_settings(dir: &tempfile::TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.transcript.provider = TranscriptProvider::Sqlite;
        settings.transcript.sqlite_path = dir.path().join("history.db").display().to_string();
        settings
    }

    #[tokio::test]
    async fn test_create_and_clear_memory_session() {
        let mut session = create_session(&Settings::default()).unwrap();
        session
            .store()
            .append_turn("hi", &AssistantTurn::new(vec![TurnPart::text("hello")]))
            .await
            .unwrap();
        assert_eq!(session.transcript().await.unwrap().len(), 2);

        clear_session(&mut session).await.unwrap();
        assert!(session.transcript().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_sqlite_session() {
        let dir = tempfile::tempdir().unwrap();
        let settings = sqlite_settings(&dir);

        let session = create_session(&settings).unwrap();
        let id = session.id().to_string();
        session
            .store()
            .append_turn("flu?", &AssistantTurn::new(vec![TurnPart::text("Rest.")]))
            .await
            .unwrap();
        drop(session);

        let resumed = open_session(&settings, &id).unwrap();
        assert_eq!(resumed.id().to_string(), id);
        let entries = resumed.transcript().await.unwrap();
        assert_eq!(entries[0], TranscriptEntry::User("flu?".to_string()));
    }

    #[test]
    fn test_open_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let settings = sqlite_settings(&dir);

        let err = open_session(&settings, &Uuid::new_v4().to_string()).err().unwrap();
        assert!(matches!(err, HealthbotError::SessionNotFound(_)));

        let err = open_session(&settings, "not-a-uuid").err().unwrap();
        assert!(matches!(err, HealthbotError::InvalidInput(_)));

        let err = open_session(&Settings::default(), &Uuid::new_v4().to_string())
            .err()
            .unwrap();
        assert!(matches!(err, HealthbotError::SessionNotFound(_)));
    }
}
