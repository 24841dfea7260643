//! Turn loosely specified deploy input into a [`DeploymentRequest`].
//!
//! Input arrives as zero, one, or two free-form tokens, or as an already
//! parsed intent. Missing pieces (app name, repository, branch) are asked
//! for through the [`Dialog`]. Declining any prompt aborts the resolution
//! before anything is written to the registry.

use regex::Regex;

use crate::dialog::{Dialog, Notifier};
use crate::error::ResolutionError;
use crate::github::{Branch, RepoHost};
use crate::registry::AppRegistry;
use crate::request::{
    DeploymentRequest, RepoEntry, RepoRef, classify, is_repo_reference, validate_app_name,
};

const REGISTER_PAIR_PATTERN: &str = r"^\s*(\S+/\S+)\s+(\S+)\s*$";
const SINGLE_TOKEN_PATTERN: &str = r"^\s*(\S+)\s*$";
const BRANCH_TEXT_PATTERN: &str = r"(?:\S+\s+){1}(\S+)";

/// Raw deploy input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployCommand {
    /// `deploy`
    Bare,
    /// `deploy <app>` or `deploy <repo>`
    Single(String),
    /// `deploy <app> <repo>` in either order
    Pair(String, String),
    /// Fields extracted upstream, e.g. by a natural-language layer
    Intent {
        app: Option<String>,
        url: Option<String>,
    },
}

impl DeployCommand {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ResolutionError> {
        match tokens {
            [] => Ok(Self::Bare),
            [one] => Ok(Self::Single(one.as_ref().to_string())),
            [first, second] => Ok(Self::Pair(
                first.as_ref().to_string(),
                second.as_ref().to_string(),
            )),
            more => Err(ResolutionError::TooManyTokens(more.len())),
        }
    }
}

pub struct InputResolver<'a> {
    dialog: &'a dyn Dialog,
    notifier: &'a dyn Notifier,
    repo_host: &'a dyn RepoHost,
    registry: &'a dyn AppRegistry,
}

impl<'a> InputResolver<'a> {
    pub fn new(
        dialog: &'a dyn Dialog,
        notifier: &'a dyn Notifier,
        repo_host: &'a dyn RepoHost,
        registry: &'a dyn AppRegistry,
    ) -> Self {
        Self {
            dialog,
            notifier,
            repo_host,
            registry,
        }
    }

    /// Resolve `command` into a complete request.
    ///
    /// Newly given app/repository pairs are saved to the registry once the
    /// request is complete.
    pub async fn resolve(&self, command: DeployCommand) -> Result<DeploymentRequest, ResolutionError> {
        let (entry, register) = match command {
            DeployCommand::Bare => self.resolve_bare().await?,
            DeployCommand::Single(token) if is_repo_reference(&token) => {
                (self.register_repository(token).await?, true)
            }
            DeployCommand::Single(app) => self.lookup_app(app).await?,
            DeployCommand::Pair(first, second) => {
                let entry = classify(&first, &second).ok_or_else(|| {
                    ResolutionError::InvalidRepository(format!("{first} {second}"))
                })?;
                (entry, true)
            }
            DeployCommand::Intent { app, url } => (Self::entry_from_intent(app, url)?, true),
        };
        validate_app_name(&entry.app)?;

        let request = self.complete(entry).await?;
        if register {
            self.registry.upsert(&request.app, &request.url).await?;
        }

        tracing::info!(
            app = %request.app,
            owner = %request.owner,
            repo = %request.repo,
            branch = %request.branch,
            "Deployment request resolved"
        );
        Ok(request)
    }

    fn entry_from_intent(
        app: Option<String>,
        url: Option<String>,
    ) -> Result<RepoEntry, ResolutionError> {
        let app = app
            .filter(|a| !a.trim().is_empty())
            .ok_or(ResolutionError::MissingAppName)?;
        let url = url.unwrap_or_default();
        if !is_repo_reference(&url) {
            return Err(ResolutionError::InvalidRepository(url));
        }
        Ok(RepoEntry::new(app.trim(), url.trim()))
    }

    async fn resolve_bare(&self) -> Result<(RepoEntry, bool), ResolutionError> {
        let apps = self.registry.entries().await?;

        if apps.is_empty() {
            self.notifier
                .progress("No applications are registered for deployment yet.");
            self.dialog
                .confirm(
                    "Would you like to register a repository and deploy it?",
                    "OK, maybe another time.",
                )
                .await?;

            let groups = self
                .dialog
                .expect(
                    "Provide the repository and application name as `<owner>/<repo> <app-name>`.",
                    &pattern(REGISTER_PAIR_PATTERN)?,
                )
                .await?;
            let entry = classify(group(&groups, 1), group(&groups, 2)).ok_or_else(|| {
                ResolutionError::InvalidRepository(group(&groups, 0).to_string())
            })?;
            validate_app_name(&entry.app)?;

            self.dialog
                .confirm(
                    &format!("Deploy application {} from {}?", entry.app, entry.url),
                    "OK, the deployment is cancelled.",
                )
                .await?;
            return Ok((entry, true));
        }

        for (app, url) in &apps {
            self.notifier.progress(&format!("{app} (repository: {url})"));
        }

        let chooser = known_app_pattern(apps.keys().map(String::as_str))?;
        let groups = self
            .dialog
            .expect("Which application do you want to deploy?", &chooser)
            .await?;
        let chosen = group(&groups, 1).trim();

        let (app, url) = apps
            .iter()
            .find(|(app, _)| app.eq_ignore_ascii_case(chosen))
            .ok_or(ResolutionError::MissingAppName)?;
        Ok((RepoEntry::new(app.as_str(), url.as_str()), false))
    }

    async fn register_repository(&self, url: String) -> Result<RepoEntry, ResolutionError> {
        self.dialog
            .confirm(
                &format!("Would you like to register {url} and deploy it?"),
                "OK, it will not be registered.",
            )
            .await?;

        let groups = self
            .dialog
            .expect(
                "What application name should it be deployed as?",
                &pattern(SINGLE_TOKEN_PATTERN)?,
            )
            .await?;
        let app = group(&groups, 1).trim();
        validate_app_name(app)?;

        self.notifier
            .progress(&format!("Registering {app} with repository {url}."));
        Ok(RepoEntry::new(app, url))
    }

    async fn lookup_app(&self, app: String) -> Result<(RepoEntry, bool), ResolutionError> {
        validate_app_name(&app)?;
        if let Some(url) = self.registry.get(&app).await? {
            tracing::debug!(app = %app, url = %url, "Found registered application");
            return Ok((RepoEntry::new(app, url), false));
        }

        self.notifier
            .progress(&format!("There is no registered application named {app}."));
        self.dialog
            .confirm(
                "Would you like to register a repository for it?",
                "OK, maybe another time.",
            )
            .await?;

        let url = self.prompt_repository().await?;
        Ok((RepoEntry::new(app, url), true))
    }

    /// Ask for a repository reference, re-prompting once on bad input.
    async fn prompt_repository(&self) -> Result<String, ResolutionError> {
        let single = pattern(SINGLE_TOKEN_PATTERN)?;
        let prompt = "Which repository (`<owner>/<repo>`) holds it?";

        let first = self.ask_token(prompt, &single).await?;
        if is_repo_reference(&first) {
            return Ok(first);
        }
        self.notifier.progress(&format!(
            "{first} is not a repository reference. Use the form `<owner>/<repo>`."
        ));

        let second = self.ask_token(prompt, &single).await?;
        if is_repo_reference(&second) {
            Ok(second)
        } else {
            Err(ResolutionError::InvalidRepository(second))
        }
    }

    async fn ask_token(&self, prompt: &str, pattern: &Regex) -> Result<String, ResolutionError> {
        let groups = self.dialog.expect(prompt, pattern).await?;
        Ok(group(&groups, 1).trim().to_string())
    }

    async fn complete(&self, entry: RepoEntry) -> Result<DeploymentRequest, ResolutionError> {
        let parsed = RepoRef::parse(&entry.url)?;
        let branch = match parsed.branch {
            Some(branch) => branch,
            None => self.resolve_branch(&parsed.owner, &parsed.repo).await?,
        };

        Ok(DeploymentRequest {
            app: entry.app,
            owner: parsed.owner,
            repo: parsed.repo,
            branch,
            url: entry.url,
        })
    }

    async fn resolve_branch(&self, owner: &str, repo: &str) -> Result<String, ResolutionError> {
        match self.repo_host.list_branches(owner, repo).await {
            Ok(branches) if branches.len() == 1 => {
                let branch = branches.into_iter().next().map(|b| b.name).unwrap_or_default();
                tracing::debug!(owner, repo, branch = %branch, "Single branch selected");
                Ok(branch)
            }
            Ok(branches) if !branches.is_empty() => self.choose_branch(&branches).await,
            Ok(_) => {
                tracing::warn!(owner, repo, "Repository host listed no branches");
                self.prompt_branch().await
            }
            Err(err) => {
                tracing::warn!(owner, repo, error = %err, "Failed to list branches");
                self.prompt_branch().await
            }
        }
    }

    async fn choose_branch(&self, branches: &[Branch]) -> Result<String, ResolutionError> {
        let mut prompt = String::from("Which branch do you want to deploy?\n");
        for (i, branch) in branches.iter().enumerate() {
            prompt.push_str(&format!("({})  {}\n", i + 1, branch.name));
        }

        let groups = self
            .dialog
            .expect(&prompt, &numbered_list_pattern(branches.len())?)
            .await?;
        let choice = group(&groups, 1);

        choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| branches.get(idx))
            .map(|b| b.name.clone())
            .ok_or_else(|| ResolutionError::UnknownBranch(choice.to_string()))
    }

    async fn prompt_branch(&self) -> Result<String, ResolutionError> {
        let groups = self
            .dialog
            .expect(
                "Which branch do you want to deploy? Reply with `branch <name>`.",
                &pattern(BRANCH_TEXT_PATTERN)?,
            )
            .await?;
        let branch = group(&groups, 1).trim();
        if branch.is_empty() {
            return Err(ResolutionError::UnknownBranch(group(&groups, 0).to_string()));
        }
        Ok(branch.to_string())
    }
}

fn group(groups: &[String], index: usize) -> &str {
    groups.get(index).map(String::as_str).unwrap_or_default()
}

fn pattern(source: &str) -> Result<Regex, ResolutionError> {
    Regex::new(source).map_err(|e| ResolutionError::Dialog(e.to_string()))
}

/// Case-insensitive pattern accepting exactly one of the known app names.
pub fn known_app_pattern<'n>(
    names: impl IntoIterator<Item = &'n str>,
) -> Result<Regex, ResolutionError> {
    let alternatives: Vec<String> = names.into_iter().map(regex::escape).collect();
    pattern(&format!(r"(?i)^\s*({})\s*$", alternatives.join("|")))
}

/// Pattern accepting exactly the numbers `1..=count`.
pub fn numbered_list_pattern(count: usize) -> Result<Regex, ResolutionError> {
    let numbers: Vec<String> = (1..=count).rev().map(|n| n.to_string()).collect();
    pattern(&format!(r"^\s*({})\s*$", numbers.join("|")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_tokens() {
        assert_eq!(
            DeployCommand::from_tokens::<&str>(&[]).unwrap(),
            DeployCommand::Bare
        );
        assert_eq!(
            DeployCommand::from_tokens(&["app"]).unwrap(),
            DeployCommand::Single("app".into())
        );
        assert_eq!(
            DeployCommand::from_tokens(&["a", "b/c"]).unwrap(),
            DeployCommand::Pair("a".into(), "b/c".into())
        );
        assert!(matches!(
            DeployCommand::from_tokens(&["a", "b", "c"]),
            Err(ResolutionError::TooManyTokens(3))
        ));
    }

    #[test]
    fn numbered_list_is_strict() {
        let pattern = numbered_list_pattern(12).unwrap();
        assert!(pattern.is_match("1"));
        assert!(pattern.is_match(" 12 "));
        assert!(pattern.is_match("10"));
        assert!(!pattern.is_match("0"));
        assert!(!pattern.is_match("13"));
        assert!(!pattern.is_match("2a"));
        assert!(!pattern.is_match("master"));
    }

    #[test]
    fn known_app_pattern_is_case_insensitive_and_exact() {
        let pattern = known_app_pattern(["node-helloworld", "api.v2"]).unwrap();
        assert!(pattern.is_match("Node-HelloWorld"));
        assert!(pattern.is_match("api.v2"));
        assert!(!pattern.is_match("apixv2"));
        assert!(!pattern.is_match("node"));
    }

    #[test]
    fn branch_text_takes_second_token() {
        let pattern = pattern(BRANCH_TEXT_PATTERN).unwrap();
        let caps = pattern.captures("branch release-1").unwrap();
        assert_eq!(&caps[1], "release-1");
    }

    #[test]
    fn intent_requires_both_fields() {
        assert!(matches!(
            InputResolver::entry_from_intent(None, Some("a/b".into())),
            Err(ResolutionError::MissingAppName)
        ));
        assert!(matches!(
            InputResolver::entry_from_intent(Some("app".into()), None),
            Err(ResolutionError::InvalidRepository(_))
        ));
        let entry =
            InputResolver::entry_from_intent(Some("app".into()), Some("a/b".into())).unwrap();
        assert_eq!(entry, RepoEntry::new("app", "a/b"));
    }
}
