//! Conversational collaborators: interactive prompts and progress output.

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::error::ResolutionError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialogError {
    /// The user answered no; carries the message to show them.
    #[error("{0}")]
    Declined(String),

    #[error("prompt timed out")]
    TimedOut,

    #[error("{0}")]
    Failed(String),
}

impl From<DialogError> for ResolutionError {
    fn from(err: DialogError) -> Self {
        match err {
            DialogError::Declined(message) => ResolutionError::Declined(message),
            DialogError::TimedOut => ResolutionError::TimedOut,
            DialogError::Failed(message) => ResolutionError::Dialog(message),
        }
    }
}

/// Interactive clarification with the user.
///
/// Implementations own time-boxing; a timeout is reported as
/// [`DialogError::TimedOut`] and treated like a decline.
#[async_trait]
pub trait Dialog: Send + Sync {
    /// Ask a yes/no question. `Err(Declined(decline_message))` on no.
    async fn confirm(&self, prompt: &str, decline_message: &str) -> Result<(), DialogError>;

    /// Ask for a response matching `pattern` and return its capture groups,
    /// index 0 being the whole match. Unmatched groups are empty strings.
    async fn expect(&self, prompt: &str, pattern: &Regex) -> Result<Vec<String>, DialogError>;
}

/// Fire-and-forget progress output.
pub trait Notifier: Send + Sync {
    fn progress(&self, message: &str);
}

/// Collect all capture groups of `pattern` in `text`.
pub fn captures(pattern: &Regex, text: &str) -> Option<Vec<String>> {
    pattern.captures(text).map(|caps| {
        caps.iter()
            .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}
