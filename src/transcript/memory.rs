//! In-memory transcript store.

use super::{AssistantTurn, TranscriptEntry, TranscriptStore};
use crate::error::{HealthbotError, Result};
use async_trait::async_trait;
use std::sync::RwLock;

/// Transcript kept in memory for the lifetime of the session.
#[derive(Default)]
pub struct MemoryTranscriptStore {
    entries: RwLock<Vec<TranscriptEntry>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: TranscriptEntry) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| HealthbotError::Transcript(format!("Failed to acquire lock: {}", e)))?
            .push(entry);
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn append_user(&self, text: &str) -> Result<()> {
        self.push(TranscriptEntry::User(text.to_string()))
    }

    async fn append_assistant(&self, turn: &AssistantTurn) -> Result<()> {
        self.push(TranscriptEntry::Assistant(turn.clone()))
    }

    async fn all(&self) -> Result<Vec<TranscriptEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HealthbotError::Transcript(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.clone())
    }

    async fn clear(&self) -> Result<()> {
        self.entries
            .write()
            .map_err(|e| HealthbotError::Transcript(format!("Failed to acquire lock: {}", e)))?
            .clear();
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|e| HealthbotError::Transcript(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::TurnPart;

    #[tokio::test]
    async fn test_append_then_all_returns_turn() {
        let store = MemoryTranscriptStore::new();
        let turn = AssistantTurn::new(vec![
            TurnPart::text("Call emergency services first."),
            TurnPart::VideoResults {
                videos: vec!["a".into(), "b".into(), "c".into()],
            },
        ]);

        store.append_user("How do I do CPR?").await.unwrap();
        store.append_assistant(&turn).await.unwrap();

        let entries = store.all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], TranscriptEntry::User("How do I do CPR?".to_string()));
        assert_eq!(entries.last(), Some(&TranscriptEntry::Assistant(turn)));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryTranscriptStore::new();
        store
            .append_turn("hi", &AssistantTurn::new(vec![TurnPart::text("hello")]))
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        store.clear().await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }
}
