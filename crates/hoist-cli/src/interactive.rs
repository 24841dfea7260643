//! Terminal dialog and progress output.
//!
//! Prompts run on the blocking pool through dialoguer and are time-boxed;
//! an unanswered prompt reports [`DialogError::TimedOut`].

use std::time::Duration;

use async_trait::async_trait;
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use regex::Regex;

use hoist_core::dialog::{Dialog, DialogError, Notifier, captures};

pub struct TerminalDialog {
    timeout: Duration,
}

impl TerminalDialog {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run_blocking<T, F>(&self, prompt: F) -> Result<T, DialogError>
    where
        F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(prompt);
        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                tracing::debug!(timeout = ?self.timeout, "Prompt timed out");
                Err(DialogError::TimedOut)
            }
            Ok(Err(join)) => Err(DialogError::Failed(join.to_string())),
            Ok(Ok(Err(err))) => Err(DialogError::Failed(err.to_string())),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

#[async_trait]
impl Dialog for TerminalDialog {
    async fn confirm(&self, prompt: &str, decline_message: &str) -> Result<(), DialogError> {
        let prompt = prompt.to_string();
        let accepted = self
            .run_blocking(move || {
                Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt(prompt)
                    .default(true)
                    .interact()
            })
            .await?;

        if accepted {
            Ok(())
        } else {
            Err(DialogError::Declined(decline_message.to_string()))
        }
    }

    async fn expect(&self, prompt: &str, pattern: &Regex) -> Result<Vec<String>, DialogError> {
        let (question, details) = split_prompt(prompt);
        let question = question.to_string();
        let details: Vec<String> = details.into_iter().map(str::to_string).collect();
        let pattern = pattern.clone();

        self.run_blocking(move || {
            for line in &details {
                println!("  {}", style(line).dim());
            }
            let reply: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(question)
                .validate_with(|input: &String| -> Result<(), String> {
                    if pattern.is_match(input) {
                        Ok(())
                    } else {
                        Err("That reply was not understood, try again.".to_string())
                    }
                })
                .interact_text()?;
            Ok(captures(&pattern, &reply).unwrap_or_default())
        })
        .await
    }
}

/// First line is the question; the rest (e.g. a numbered menu) is shown above it.
fn split_prompt(prompt: &str) -> (&str, Vec<&str>) {
    let mut lines = prompt.lines().filter(|l| !l.trim().is_empty());
    let question = lines.next().unwrap_or_default();
    (question, lines.collect())
}

/// Prints progress messages to stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn progress(&self, message: &str) {
        println!("{}", format_progress(message));
    }
}

fn format_progress(message: &str) -> String {
    format!("{} {}", style("›").cyan().bold(), message)
}
