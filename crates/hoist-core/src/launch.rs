//! Start an application and check on it once after a fixed delay.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::dialog::Notifier;
use crate::error::{DeployError, PlatformError};
use crate::platform::{AppSummary, Platform};

/// Delay before the single post-start status query.
pub const STATUS_CHECK_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeState {
    Started,
    Unknown,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentOutcome {
    pub state: OutcomeState,
    /// Public URL of the first route; empty when unknown or unrouted
    pub url: String,
    pub error: Option<String>,
}

impl DeploymentOutcome {
    pub fn started(url: impl Into<String>) -> Self {
        Self {
            state: OutcomeState::Started,
            url: url.into(),
            error: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            state: OutcomeState::Unknown,
            url: String::new(),
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            state: OutcomeState::Failed,
            url: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Map the one summary query to an outcome. Query failures are `Unknown`.
pub fn evaluate_summary(summary: Result<AppSummary, PlatformError>) -> DeploymentOutcome {
    match summary {
        Ok(summary) if summary.is_started() => {
            DeploymentOutcome::started(summary.first_route_url().unwrap_or_default())
        }
        Ok(summary) => {
            tracing::debug!(state = %summary.state, "Application not started at status check");
            DeploymentOutcome::unknown()
        }
        Err(err) => {
            tracing::warn!(error = %err, "Status check failed");
            DeploymentOutcome::unknown()
        }
    }
}

/// Handle to the deferred status check.
///
/// Dropping the handle cancels the check; call [`StatusCheck::detach`] to
/// let it run unobserved.
#[derive(Debug)]
pub struct StatusCheck {
    handle: Option<JoinHandle<DeploymentOutcome>>,
}

impl StatusCheck {
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the check. `None` if it was cancelled.
    pub async fn wait(mut self) -> Option<DeploymentOutcome> {
        let handle = self.handle.take()?;
        handle.await.ok()
    }

    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for StatusCheck {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct Launcher {
    platform: Arc<dyn Platform>,
    notifier: Arc<dyn Notifier>,
    delay: Duration,
}

impl Launcher {
    pub fn new(platform: Arc<dyn Platform>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            platform,
            notifier,
            delay: STATUS_CHECK_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Start the application and schedule the status check.
    pub async fn launch(&self, app: &str, app_guid: &str) -> Result<StatusCheck, DeployError> {
        self.platform
            .start_app(app_guid)
            .await
            .map_err(|source| DeployError::Launch {
                app: app.to_string(),
                source,
            })?;

        tracing::info!(app, guid = app_guid, "Application start accepted");
        self.notifier
            .progress(&format!("Starting application {app}."));

        let platform = Arc::clone(&self.platform);
        let notifier = Arc::clone(&self.notifier);
        let delay = self.delay;
        let app = app.to_string();
        let guid = app_guid.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::info!(app = %app, "Checking application state");
            let outcome = evaluate_summary(platform.get_app_summary(&guid).await);
            notifier.progress(&completion_message(&app, &outcome));
            outcome
        });

        Ok(StatusCheck {
            handle: Some(handle),
        })
    }
}

fn completion_message(app: &str, outcome: &DeploymentOutcome) -> String {
    match outcome.state {
        OutcomeState::Started if outcome.url.is_empty() => {
            format!("Application {app} is running. It has no route.")
        }
        OutcomeState::Started => format!("Application {app} is running at {}", outcome.url),
        OutcomeState::Unknown => format!(
            "Application {app} was started but its state is unknown. Check it on the platform."
        ),
        OutcomeState::Failed => format!(
            "Deployment of {app} failed: {}",
            outcome.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
