//! CLI output formatting utilities.

use crate::tools::youtube_watch_url;
use crate::transcript::{AssistantTurn, TranscriptEntry, TurnPart};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a user message as it appears in the chat.
    pub fn user_message(text: &str) {
        println!("{} {}", style("You:").green().bold(), text);
    }

    /// Print every part of an assistant turn, in order.
    pub fn assistant_turn(turn: &AssistantTurn) {
        println!();
        for part in turn.parts() {
            match part {
                TurnPart::Text { text } => {
                    if !text.is_empty() {
                        println!("{} {}", style("Healthbot:").cyan().bold(), text);
                    }
                }
                TurnPart::LinkResults { results } => {
                    println!("\n{}", style("Relevant links").bold());
                    for link in results {
                        match &link.title {
                            Some(title) => println!(
                                "  {} {} {}",
                                style("*").cyan(),
                                style(title).bold(),
                                style(&link.url).underlined()
                            ),
                            None => {
                                println!("  {} {}", style("*").cyan(), style(&link.url).underlined())
                            }
                        }
                        println!("    {}", style(content_preview(&link.content, 200)).dim());
                    }
                }
                TurnPart::VideoResults { videos } => {
                    println!("\n{}", style("YouTube videos").bold());
                    for video in videos {
                        Output::list_item(&youtube_watch_url(video));
                    }
                }
            }
        }
        println!();
    }

    /// Replay one transcript entry.
    pub fn transcript_entry(entry: &TranscriptEntry) {
        match entry {
            TranscriptEntry::User(text) => Output::user_message(text),
            TranscriptEntry::Assistant(turn) => Output::assistant_turn(turn),
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short\ntext", 20), "short text");
        assert_eq!(content_preview("abcdefghij", 4), "abcd...");
        // Multi-byte characters are never split.
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
