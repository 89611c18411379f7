//! Chat transcript: the append-only record of every turn in a session.
//!
//! The transcript drives both UI replay and the message history sent to the
//! model. Only text is replayed to the model; link and video results are
//! display artifacts.

mod memory;
mod sqlite;

pub use memory::MemoryTranscriptStore;
pub use sqlite::{SessionSummary, SqliteTranscriptStore};

use crate::error::Result;
use crate::llm::Message;
use crate::tools::LinkResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One renderable unit of an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnPart {
    Text { text: String },
    LinkResults { results: Vec<LinkResult> },
    VideoResults { videos: Vec<String> },
}

impl TurnPart {
    pub fn text(text: impl Into<String>) -> Self {
        TurnPart::Text { text: text.into() }
    }
}

/// Everything the assistant produced for one user message, in production order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssistantTurn {
    parts: Vec<TurnPart>,
}

impl AssistantTurn {
    pub fn new(parts: Vec<TurnPart>) -> Self {
        Self { parts }
    }

    pub fn push(&mut self, part: TurnPart) {
        self.parts.push(part);
    }

    pub fn parts(&self) -> &[TurnPart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Concatenation of all text parts; this is what the model sees next turn.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TurnPart::Text { text } => Some(text.as_str()),
                TurnPart::LinkResults { .. } | TurnPart::VideoResults { .. } => None,
            })
            .collect()
    }

    /// Every link result across the turn.
    pub fn links(&self) -> impl Iterator<Item = &LinkResult> {
        self.parts.iter().flat_map(|part| match part {
            TurnPart::LinkResults { results } => results.as_slice(),
            _ => &[],
        })
    }

    /// Every video across the turn.
    pub fn videos(&self) -> impl Iterator<Item = &String> {
        self.parts.iter().flat_map(|part| match part {
            TurnPart::VideoResults { videos } => videos.as_slice(),
            _ => &[],
        })
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum TranscriptEntry {
    User(String),
    Assistant(AssistantTurn),
}

impl TranscriptEntry {
    pub fn role(&self) -> &'static str {
        match self {
            TranscriptEntry::User(_) => "user",
            TranscriptEntry::Assistant(_) => "assistant",
        }
    }
}

/// Rebuild the model-facing message history from a transcript.
pub fn history_messages(entries: &[TranscriptEntry]) -> Vec<Message> {
    entries
        .iter()
        .map(|entry| match entry {
            TranscriptEntry::User(text) => Message::user(text.as_str()),
            TranscriptEntry::Assistant(turn) => Message::assistant(turn.text()),
        })
        .collect()
}

/// Trait for transcript storage backends. Entries are only ever appended or
/// cleared all at once.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_user(&self, text: &str) -> Result<()>;

    async fn append_assistant(&self, turn: &AssistantTurn) -> Result<()>;

    /// All entries, oldest first.
    async fn all(&self) -> Result<Vec<TranscriptEntry>>;

    /// Remove every entry.
    async fn clear(&self) -> Result<()>;

    async fn len(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }

    /// Append a user message and its answer as one unit.
    async fn append_turn(&self, user_text: &str, turn: &AssistantTurn) -> Result<()> {
        self.append_user(user_text).await?;
        self.append_assistant(turn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_turn() -> AssistantTurn {
        AssistantTurn::new(vec![
            TurnPart::text("Migraines are "),
            TurnPart::LinkResults {
                results: vec![LinkResult {
                    url: "https://www.nhs.uk/conditions/migraine/".to_string(),
                    content: "Migraine overview".to_string(),
                    title: Some("Migraine - NHS".to_string()),
                }],
            },
            TurnPart::text("often hereditary."),
            TurnPart::VideoResults {
                videos: vec!["hizBdM1Ob68".to_string()],
            },
        ])
    }

    #[test]
    fn test_turn_text_skips_results() {
        let turn = sample_turn();
        assert_eq!(turn.text(), "Migraines are often hereditary.");
        assert_eq!(turn.links().count(), 1);
        assert_eq!(turn.videos().collect::<Vec<_>>(), vec!["hizBdM1Ob68"]);
    }

    #[test]
    fn test_history_replays_text_only() {
        let entries = vec![
            TranscriptEntry::User("What causes a migraine?".to_string()),
            TranscriptEntry::Assistant(sample_turn()),
        ];

        let messages = history_messages(&entries);
        assert_eq!(
            messages,
            vec![
                Message::user("What causes a migraine?"),
                Message::assistant("Migraines are often hereditary."),
            ]
        );
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = TranscriptEntry::Assistant(AssistantTurn::new(vec![TurnPart::text("hi")]));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "hi");

        let back: TranscriptEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
