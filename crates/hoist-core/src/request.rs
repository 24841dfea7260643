//! Deployment request types and repository reference parsing.

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

const TREE_MARKER: &str = "/tree/";

/// An app name paired with a repository reference, before the branch is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    /// Application name on the platform
    pub app: String,
    /// Repository reference as the user typed it
    pub url: String,
}

impl RepoEntry {
    pub fn new(app: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            url: url.into(),
        }
    }
}

/// A fully resolved deployment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub app: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Repository reference as originally given
    pub url: String,
}

/// Repository reference split into owner, name, and an optional branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
}

impl RepoRef {
    /// Parse `owner/repo`, `https://host/owner/repo`, optionally suffixed
    /// with `/tree/<branch>`.
    pub fn parse(reference: &str) -> Result<Self, ResolutionError> {
        let (base, branch) = split_branch(reference);
        let base = base.trim().trim_end_matches('/');
        let base = base.strip_suffix(".git").unwrap_or(base);

        let mut segments = base.rsplit('/');
        let repo = segments.next().unwrap_or_default();
        let owner = segments.next().unwrap_or_default();

        if owner.is_empty() || repo.is_empty() || owner.ends_with(':') {
            return Err(ResolutionError::InvalidRepository(reference.to_string()));
        }

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.filter(|b| !b.is_empty()).map(str::to_string),
        })
    }
}

/// Split `<base>/tree/<branch>` into base and branch.
///
/// The last `/tree/` marker wins so a branch name may not contain one.
pub fn split_branch(reference: &str) -> (&str, Option<&str>) {
    match reference.rfind(TREE_MARKER) {
        Some(idx) => (
            &reference[..idx],
            Some(&reference[idx + TREE_MARKER.len()..]),
        ),
        None => (reference, None),
    }
}

/// Whether a token looks like a repository reference.
pub fn is_repo_reference(token: &str) -> bool {
    token.contains('/')
}

/// Check that `app` can name a platform application.
///
/// Names end up in log lines, registry keys and staging paths, so path
/// separators and parent references are refused.
pub fn validate_app_name(app: &str) -> Result<(), ResolutionError> {
    if app.trim().is_empty() {
        return Err(ResolutionError::MissingAppName);
    }
    if app.contains(['/', '\\']) || app.contains("..") {
        return Err(ResolutionError::InvalidAppName(app.to_string()));
    }
    Ok(())
}

/// Assign two free-form tokens to app name and repository reference.
///
/// Order does not matter: the token containing a path separator is the
/// repository. Returns `None` when neither token contains one.
pub fn classify(first: &str, second: &str) -> Option<RepoEntry> {
    if is_repo_reference(first) {
        Some(RepoEntry::new(second, first))
    } else if is_repo_reference(second) {
        Some(RepoEntry::new(first, second))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_branch_extracts_tree_suffix() {
        let (base, branch) = split_branch("https://github.com/normanb/node-helloworld/tree/dev");
        assert_eq!(base, "https://github.com/normanb/node-helloworld");
        assert_eq!(branch, Some("dev"));
    }

    #[test]
    fn split_branch_without_suffix() {
        let (base, branch) = split_branch("normanb/node-helloworld");
        assert_eq!(base, "normanb/node-helloworld");
        assert_eq!(branch, None);
    }

    #[test]
    fn split_branch_keeps_nested_branch_path() {
        let (base, branch) = split_branch("owner/repo/tree/feature/login");
        assert_eq!(base, "owner/repo");
        assert_eq!(branch, Some("feature/login"));
    }

    #[test]
    fn classify_is_symmetric() {
        let a = classify("node-helloworld", "normanb/node-helloworld");
        let b = classify("normanb/node-helloworld", "node-helloworld");
        assert_eq!(a, b);
        let entry = a.unwrap();
        assert_eq!(entry.app, "node-helloworld");
        assert_eq!(entry.url, "normanb/node-helloworld");
    }

    #[test]
    fn app_names_cannot_leave_a_directory() {
        assert!(validate_app_name("node-helloworld").is_ok());
        assert!(validate_app_name("api.v2").is_ok());
        assert!(matches!(
            validate_app_name("  "),
            Err(ResolutionError::MissingAppName)
        ));
        for bad in ["../../../victim", "a/b", "a\\b", "..", "x..y"] {
            assert!(
                matches!(validate_app_name(bad), Err(ResolutionError::InvalidAppName(ref n)) if n == bad),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn classify_without_repository_is_none() {
        assert!(classify("one", "two").is_none());
    }

    #[test]
    fn parse_short_reference() {
        let parsed = RepoRef::parse("normanb/node-helloworld").unwrap();
        assert_eq!(parsed.owner, "normanb");
        assert_eq!(parsed.repo, "node-helloworld");
        assert_eq!(parsed.branch, None);
    }

    #[test]
    fn parse_full_url_with_branch() {
        let parsed = RepoRef::parse("https://github.com/user/app.git/tree/release").unwrap();
        assert_eq!(parsed.owner, "user");
        assert_eq!(parsed.repo, "app");
        assert_eq!(parsed.branch.as_deref(), Some("release"));
    }

    #[test]
    fn parse_trailing_slash() {
        let parsed = RepoRef::parse("https://github.com/user/app/").unwrap();
        assert_eq!(parsed.owner, "user");
        assert_eq!(parsed.repo, "app");
    }

    #[test]
    fn parse_rejects_single_segment() {
        assert!(RepoRef::parse("just-a-name").is_err());
        assert!(RepoRef::parse("/repo").is_err());
        assert!(RepoRef::parse("https://repo").is_err());
    }
}
