//! Doctor command - verify API keys, storage and configuration.

use crate::cli::Output;
use crate::config::{Settings, TranscriptProvider, VideoProvider};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Healthbot Doctor");
    println!();
    println!("Checking API keys, storage and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("API Keys").bold());
    let key_checks = check_api_keys(settings, |name| std::env::var(name).ok());
    for check in &key_checks {
        check.print();
    }
    checks.extend(key_checks);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = check_storage(settings);
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Healthbot.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Healthbot is ready to use.");
    }

    Ok(())
}

/// Check every API key the configuration refers to.
///
/// The model key is required; search keys only degrade results when missing.
fn check_api_keys(settings: &Settings, lookup: impl Fn(&str) -> Option<String>) -> Vec<CheckResult> {
    let mut results = vec![check_key(
        &settings.model.api_key_env,
        lookup(&settings.model.api_key_env),
        true,
        "chat model",
    )];

    results.push(check_key(
        &settings.web_search.api_key_env,
        lookup(&settings.web_search.api_key_env),
        false,
        "web search links",
    ));

    match settings.video_search.provider {
        VideoProvider::YouTube => results.push(check_key(
            &settings.video_search.api_key_env,
            lookup(&settings.video_search.api_key_env),
            false,
            "video search",
        )),
        VideoProvider::DuckDuckGo => {
            results.push(CheckResult::ok("Video search", "duckduckgo (no key needed)"))
        }
    }

    results
}

fn check_key(env_var: &str, value: Option<String>, required: bool, used_for: &str) -> CheckResult {
    let hint = format!("Set with: export {}='...'", env_var);
    match value {
        Some(key) if key.len() > 12 && key.is_ascii() => {
            let masked = format!("{}...{}", &key[..4], &key[key.len() - 4..]);
            CheckResult::ok(env_var, &format!("configured ({})", masked))
        }
        Some(key) if !key.is_empty() => CheckResult::ok(env_var, "configured"),
        _ if required => CheckResult::error(env_var, "not set", &hint),
        _ => CheckResult::warning(env_var, &format!("not set ({} disabled)", used_for), &hint),
    }
}

/// Check the data directory and transcript database.
fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    match settings.transcript.provider {
        TranscriptProvider::Memory => {
            results.push(CheckResult::ok("Transcripts", "in memory (not persisted)"));
        }
        TranscriptProvider::Sqlite => {
            let db_path = settings.sqlite_path();
            if db_path.exists() {
                let size = std::fs::metadata(&db_path)
                    .map(|m| format_size(m.len()))
                    .unwrap_or_else(|_| "unknown size".to_string());
                results.push(CheckResult::ok(
                    "Transcripts",
                    &format!("{} ({})", db_path.display(), size),
                ));
            } else {
                results.push(CheckResult::warning(
                    "Transcripts",
                    &format!("{} (not created yet)", db_path.display()),
                    "Database will be created on the first chat",
                ));
            }
        }
    }

    results
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: healthbot config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_key_is_error_search_key_is_warning() {
        let settings = Settings::default();
        let checks = check_api_keys(&settings, |_| None);

        assert_eq!(checks[0].name, "GROQ_API_KEY");
        assert_eq!(checks[0].status, CheckStatus::Error);
        assert_eq!(checks[1].name, "TAVILY_API_KEY");
        assert_eq!(checks[1].status, CheckStatus::Warning);
        assert_eq!(checks[2].status, CheckStatus::Ok);
    }

    #[test]
    fn test_configured_key_is_masked() {
        let settings = Settings::default();
        let checks = check_api_keys(&settings, |_| Some("gsk_abcdefghijklmnop1234".to_string()));

        assert_eq!(checks[0].status, CheckStatus::Ok);
        assert_eq!(checks[0].message, "configured (gsk_...1234)");
    }

    #[test]
    fn test_youtube_provider_checks_its_key() {
        let mut settings = Settings::default();
        settings.video_search.provider = VideoProvider::YouTube;
        let checks = check_api_keys(&settings, |name| {
            (name != "YOUTUBE_API_KEY").then(|| "some-long-api-key-value".to_string())
        });

        assert_eq!(checks[2].name, "YOUTUBE_API_KEY");
        assert_eq!(checks[2].status, CheckStatus::Warning);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
