//! SQLite-backed transcript store.
//!
//! Each entry is stored as JSON under `(session_id, seq)`, so a session can be
//! reopened later and replayed exactly.

use super::{AssistantTurn, TranscriptEntry, TranscriptStore};
use crate::error::{HealthbotError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        session_id TEXT PRIMARY KEY,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS transcript_entries (
        session_id TEXT NOT NULL,
        seq INTEGER NOT NULL,
        role TEXT NOT NULL,
        content_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (session_id, seq)
    );

    CREATE INDEX IF NOT EXISTS idx_entries_created_at ON transcript_entries(created_at);
"#;

/// Summary of a stored session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub entry_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Transcript of one session persisted in SQLite.
pub struct SqliteTranscriptStore {
    conn: Mutex<Connection>,
    session_id: String,
}

impl SqliteTranscriptStore {
    /// Open (or create) the transcript of `session_id` in the database at `path`.
    #[instrument(skip_all, fields(session = %session_id))]
    pub fn open(path: &Path, session_id: &str) -> Result<Self> {
        let conn = Self::connect(path)?;
        Self::register_session(&conn, session_id)?;
        info!("Opened transcript store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
            session_id: session_id.to_string(),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(session_id: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Self::register_session(&conn, session_id)?;

        Ok(Self {
            conn: Mutex::new(conn),
            session_id: session_id.to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether a session has been recorded in the database at `path`.
    pub fn session_exists(path: &Path, session_id: &str) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let conn = Self::connect(path)?;
        let found = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE session_id = ?1",
                params![session_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// List stored sessions, most recently active first.
    pub fn list_sessions(path: &Path) -> Result<Vec<SessionSummary>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let conn = Self::connect(path)?;

        let mut stmt = conn.prepare(
            r#"
            SELECT s.session_id, s.created_at, COUNT(e.seq), MAX(e.created_at)
            FROM sessions s
            LEFT JOIN transcript_entries e ON e.session_id = s.session_id
            GROUP BY s.session_id, s.created_at
            ORDER BY COALESCE(MAX(e.created_at), s.created_at) DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session_id, created_at, count, last_activity) = row?;
            sessions.push(SessionSummary {
                session_id,
                created_at: parse_timestamp(&created_at)?,
                entry_count: count as usize,
                last_activity: last_activity.as_deref().map(parse_timestamp).transpose()?,
            });
        }

        Ok(sessions)
    }

    fn connect(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    fn register_session(conn: &Connection, session_id: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO sessions (session_id, created_at) VALUES (?1, ?2)",
            params![session_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HealthbotError::Transcript(format!("Failed to acquire lock: {}", e)))
    }

    /// Append one entry inside an open transaction.
    fn insert(&self, tx: &Transaction<'_>, entry: &TranscriptEntry) -> Result<()> {
        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), -1) + 1 FROM transcript_entries WHERE session_id = ?1",
            params![self.session_id],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO transcript_entries (session_id, seq, role, content_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                self.session_id,
                next_seq,
                entry.role(),
                serde_json::to_string(entry)?,
                Utc::now().to_rfc3339(),
            ],
        )?;

        debug!("Appended {} entry #{} to {}", entry.role(), next_seq, self.session_id);
        Ok(())
    }

    fn append_entries(&self, entries: &[TranscriptEntry]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for entry in entries {
            self.insert(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HealthbotError::Transcript(format!("Invalid timestamp '{}': {}", value, e)))
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn append_user(&self, text: &str) -> Result<()> {
        self.append_entries(&[TranscriptEntry::User(text.to_string())])
    }

    async fn append_assistant(&self, turn: &AssistantTurn) -> Result<()> {
        self.append_entries(&[TranscriptEntry::Assistant(turn.clone())])
    }

    async fn append_turn(&self, user_text: &str, turn: &AssistantTurn) -> Result<()> {
        self.append_entries(&[
            TranscriptEntry::User(user_text.to_string()),
            TranscriptEntry::Assistant(turn.clone()),
        ])
    }

    async fn all(&self) -> Result<Vec<TranscriptEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT content_json FROM transcript_entries WHERE session_id = ?1 ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![self.session_id], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            let json = row?;
            let entry: TranscriptEntry = serde_json::from_str(&json).map_err(|e| {
                HealthbotError::Transcript(format!("Failed to deserialize entry: {}", e))
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM transcript_entries WHERE session_id = ?1",
            params![self.session_id],
        )?;
        info!("Cleared {} entries from session {}", deleted, self.session_id);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transcript_entries WHERE session_id = ?1",
            params![self.session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::LinkResult;
    use crate::transcript::TurnPart;

    fn turn(text: &str) -> AssistantTurn {
        AssistantTurn::new(vec![
            TurnPart::text(text),
            TurnPart::LinkResults {
                results: vec![LinkResult {
                    url: "https://www.cdc.gov/flu/".to_string(),
                    content: "Influenza basics".to_string(),
                    title: None,
                }],
            },
        ])
    }

    #[tokio::test]
    async fn test_sqlite_roundtrip() {
        let store = SqliteTranscriptStore::in_memory("s1").unwrap();
        let answer = turn("Rest and drink fluids.");

        store.append_user("How do I treat the flu?").await.unwrap();
        store.append_assistant(&answer).await.unwrap();

        let entries = store.all().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.last(), Some(&TranscriptEntry::Assistant(answer)));
        assert_eq!(store.len().await.unwrap(), 2);

        store.clear().await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen_and_isolates_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteTranscriptStore::open(&path, "alpha").unwrap();
            store.append_turn("first", &turn("one")).await.unwrap();
            store.append_turn("second", &turn("two")).await.unwrap();

            let other = SqliteTranscriptStore::open(&path, "beta").unwrap();
            other.append_user("unrelated").await.unwrap();
        }

        let reopened = SqliteTranscriptStore::open(&path, "alpha").unwrap();
        let entries = reopened.all().await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], TranscriptEntry::User("first".to_string()));
        assert_eq!(entries[2], TranscriptEntry::User("second".to_string()));

        assert!(SqliteTranscriptStore::session_exists(&path, "beta").unwrap());
        assert!(!SqliteTranscriptStore::session_exists(&path, "gamma").unwrap());

        let sessions = SqliteTranscriptStore::list_sessions(&path).unwrap();
        assert_eq!(sessions.len(), 2);
        let alpha = sessions.iter().find(|s| s.session_id == "alpha").unwrap();
        assert_eq!(alpha.entry_count, 4);
        assert!(alpha.last_activity.is_some());
    }

    #[test]
    fn test_list_sessions_missing_db() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SqliteTranscriptStore::list_sessions(&dir.path().join("none.db")).unwrap();
        assert!(sessions.is_empty());
    }
}
