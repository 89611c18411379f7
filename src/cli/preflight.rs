//! Pre-flight checks before talking to the model.
//!
//! Validates that the credentials a command needs are present before a
//! session starts, so the first turn does not fail midway.

use crate::config::{Settings, TranscriptProvider};
use crate::error::{HealthbotError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Interactive chat requires the model key.
    Chat,
    /// One-shot questions require the model key.
    Ask,
    /// The HTTP server requires the model key.
    Serve,
    /// Replaying history requires the sqlite backend.
    History,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Chat | Operation::Ask | Operation::Serve => {
            check_api_key(&settings.model.api_key_env)?;
        }
        Operation::History => {
            if settings.transcript.provider != TranscriptProvider::Sqlite {
                return Err(HealthbotError::Config(
                    "History needs the sqlite transcript backend. Set [transcript] provider = \"sqlite\"."
                        .to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Check that the environment variable holding an API key is set.
fn check_api_key(env_var: &str) -> Result<()> {
    match std::env::var(env_var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(HealthbotError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            env_var, env_var
        ))),
        Err(_) => Err(HealthbotError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            env_var, env_var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let mut settings = Settings::default();
        settings.model.api_key_env = "HEALTHBOT_TEST_UNSET_KEY".to_string();

        let err = check(Operation::Ask, &settings).unwrap_err();
        assert!(matches!(err, HealthbotError::Config(ref msg) if msg.contains("HEALTHBOT_TEST_UNSET_KEY")));
    }

    #[test]
    fn test_history_needs_sqlite() {
        let mut settings = Settings::default();
        assert!(check(Operation::History, &settings).is_err());

        settings.transcript.provider = TranscriptProvider::Sqlite;
        assert!(check(Operation::History, &settings).is_ok());
    }
}
