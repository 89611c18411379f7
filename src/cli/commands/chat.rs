//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::AgentOrchestrator;
use crate::session::{clear_session, create_session, open_session};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(session_id: Option<String>, model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Chat, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'healthbot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.model = model;
    }

    let orchestrator = AgentOrchestrator::new(&settings)?;

    let mut session = match &session_id {
        Some(id) => open_session(&settings, id)?,
        None => create_session(&settings)?,
    };

    println!("\n{}", style("Healthbot").bold().cyan());
    println!(
        "{}\n",
        style("Ask a health question, or 'exit' to quit. Use 'clear' to reset the conversation.").dim()
    );

    if session_id.is_some() {
        let entries = session.transcript().await?;
        Output::info(&format!("Resuming session with {} entries.", entries.len()));
        for entry in &entries {
            Output::transcript_entry(entry);
        }
    } else {
        Output::kv("Session", &session.id().to_string());
        println!();
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            clear_session(&mut session).await?;
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = orchestrator.submit_user_message(&mut session, input).await;
        spinner.finish_and_clear();

        match result {
            Ok(turn) => Output::assistant_turn(&turn),
            Err(e) => {
                Output::error(&format!("Error: {}", e));
                Output::info("Nothing was saved; you can send the message again.");
            }
        }
    }

    Ok(())
}
