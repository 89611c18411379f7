//! History command: list stored sessions or replay one.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::session::open_session;
use crate::transcript::SqliteTranscriptStore;
use anyhow::Result;
use console::style;

/// Run the history command.
pub async fn run_history(session_id: Option<&str>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::History, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    match session_id {
        Some(id) => {
            let session = open_session(&settings, id)?;
            let entries = session.transcript().await?;

            Output::header(&format!("Session {}", session.id()));
            if entries.is_empty() {
                Output::info("This session has no messages.");
            }
            for entry in &entries {
                Output::transcript_entry(entry);
            }
        }
        None => {
            let sessions = SqliteTranscriptStore::list_sessions(&settings.sqlite_path())?;

            if sessions.is_empty() {
                Output::info("No stored sessions yet. Start one with: healthbot chat");
                return Ok(());
            }

            Output::header(&format!("Sessions ({})", sessions.len()));
            for summary in &sessions {
                let last = summary
                    .last_activity
                    .unwrap_or(summary.created_at)
                    .format("%Y-%m-%d %H:%M");
                println!(
                    "  {} {} ({} entries, last active {})",
                    style("*").cyan(),
                    style(&summary.session_id).bold(),
                    summary.entry_count,
                    style(last).dim()
                );
            }
            println!();
            Output::info("Replay one with: healthbot history <session-id>");
        }
    }

    Ok(())
}
