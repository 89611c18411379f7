//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::AgentOrchestrator;
use crate::session::create_session;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(question: &str, model: Option<String>, mut settings: Settings) -> Result<()> {
    // Pre-flight checks
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'healthbot doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.model = model;
    }

    let orchestrator = AgentOrchestrator::new(&settings)?;
    let mut session = create_session(&settings)?;

    let spinner = Output::spinner("Thinking...");

    match orchestrator.submit_user_message(&mut session, question).await {
        Ok(turn) => {
            spinner.finish_and_clear();
            Output::assistant_turn(&turn);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
