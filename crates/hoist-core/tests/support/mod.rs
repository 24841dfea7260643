#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use regex::Regex;

use hoist_core::archive::ArchiveSource;
use hoist_core::dialog::{Dialog, DialogError, Notifier, captures};
use hoist_core::error::{DeployError, PlatformError};
use hoist_core::github::{Branch, RepoHost};
use hoist_core::platform::{
    AppRecord, AppSummary, CreateAppRequest, Platform, Route, SharedDomain, SpaceTarget,
    SummaryDomain, SummaryRoute,
};
use zip::write::SimpleFileOptions;

// =========================================================================
// Dialog
// =========================================================================

#[derive(Debug, Clone)]
pub enum Reply {
    Yes,
    No,
    Text(String),
    Timeout,
}

pub fn text(value: &str) -> Reply {
    Reply::Text(value.to_string())
}

/// Dialog answering from a fixed script.
///
/// `expect` skips replies that do not match the pattern, the way a user
/// gets re-prompted on a terminal.
#[derive(Default)]
pub struct ScriptedDialog {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedDialog {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    fn next(&self, prompt: &str) -> Option<Reply> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Dialog for ScriptedDialog {
    async fn confirm(&self, prompt: &str, decline_message: &str) -> Result<(), DialogError> {
        match self.next(prompt) {
            Some(Reply::Yes) => Ok(()),
            Some(Reply::No) => Err(DialogError::Declined(decline_message.to_string())),
            Some(Reply::Timeout) => Err(DialogError::TimedOut),
            Some(Reply::Text(t)) => Err(DialogError::Failed(format!("expected yes/no, got {t}"))),
            None => Err(DialogError::Failed("script exhausted".into())),
        }
    }

    async fn expect(&self, prompt: &str, pattern: &Regex) -> Result<Vec<String>, DialogError> {
        loop {
            match self.next(prompt) {
                Some(Reply::Text(t)) => {
                    if let Some(groups) = captures(pattern, &t) {
                        return Ok(groups);
                    }
                }
                Some(Reply::Timeout) => return Err(DialogError::TimedOut),
                Some(other) => {
                    return Err(DialogError::Failed(format!("expected text, got {other:?}")));
                }
                None => return Err(DialogError::Failed("script exhausted".into())),
            }
        }
    }
}

// =========================================================================
// Notifier
// =========================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn progress(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

// =========================================================================
// Repository host
// =========================================================================

pub struct StubRepoHost {
    branches: Option<Vec<Branch>>,
    calls: Mutex<Vec<String>>,
}

impl StubRepoHost {
    pub fn with_branches(names: &[&str]) -> Self {
        Self {
            branches: Some(names.iter().map(|n| Branch::new(*n)).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            branches: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepoHost for StubRepoHost {
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, PlatformError> {
        self.calls.lock().unwrap().push(format!("{owner}/{repo}"));
        self.branches
            .clone()
            .ok_or_else(|| PlatformError::api(404, "Not Found"))
    }
}

// =========================================================================
// Archive source
// =========================================================================

pub struct StubArchive {
    data: Option<Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl StubArchive {
    pub fn returning(data: Vec<u8>) -> Self {
        Self {
            data: Some(data),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            data: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveSource for StubArchive {
    async fn fetch(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<u8>, DeployError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{owner}/{repo}@{branch}"));
        self.data.clone().ok_or_else(|| DeployError::Fetch {
            url: format!("https://github.com/{owner}/{repo}/archive/{branch}.zip"),
            reason: "HTTP 404".into(),
        })
    }
}

/// Zip with every file under `{top}/`, preceded by the `{top}/` entry.
pub fn snapshot_zip(top: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.add_directory(format!("{top}/"), options).unwrap();
    for (name, content) in files {
        writer.start_file(format!("{top}/{name}"), options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn empty_zip() -> Vec<u8> {
    zip::ZipWriter::new(Cursor::new(Vec::new()))
        .finish()
        .unwrap()
        .into_inner()
}

// =========================================================================
// Platform
// =========================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub lookup: bool,
    pub create_app: bool,
    pub domains: bool,
    pub routes: bool,
    pub create_route: bool,
    pub associate: bool,
    pub upload: bool,
    pub start: bool,
    pub summary: bool,
}

/// In-memory platform recording every call in order.
pub struct StubPlatform {
    existing: Option<AppRecord>,
    domains: Vec<SharedDomain>,
    routes: Vec<Route>,
    summary: AppSummary,
    failures: Failures,
    calls: Mutex<Vec<String>>,
    created: Mutex<Vec<CreateAppRequest>>,
    uploaded: Mutex<Vec<Vec<u8>>>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self {
            existing: None,
            domains: vec![SharedDomain {
                guid: "domain-1".into(),
                name: "apps.example.com".into(),
            }],
            routes: Vec::new(),
            summary: AppSummary {
                state: "STARTED".into(),
                routes: vec![SummaryRoute {
                    host: "node-helloworld".into(),
                    domain: SummaryDomain {
                        name: "apps.example.com".into(),
                    },
                }],
            },
            failures: Failures::default(),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            uploaded: Mutex::new(Vec::new()),
        }
    }
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_app(mut self, name: &str, guid: &str) -> Self {
        self.existing = Some(AppRecord {
            guid: guid.into(),
            name: name.into(),
            space_guid: "space-1".into(),
            existing: true,
        });
        self
    }

    pub fn with_domains(mut self, domains: &[(&str, &str)]) -> Self {
        self.domains = domains
            .iter()
            .map(|(guid, name)| SharedDomain {
                guid: guid.to_string(),
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn with_route(mut self, guid: &str, host: &str, domain_guid: &str) -> Self {
        self.routes.push(Route {
            guid: guid.into(),
            host: host.into(),
            domain_guid: domain_guid.into(),
        });
        self
    }

    pub fn with_summary_state(mut self, state: &str) -> Self {
        self.summary.state = state.into();
        self
    }

    pub fn with_failures(mut self, failures: Failures) -> Self {
        self.failures = failures;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    pub fn created(&self) -> Vec<CreateAppRequest> {
        self.created.lock().unwrap().clone()
    }

    pub fn uploaded(&self) -> Vec<Vec<u8>> {
        self.uploaded.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn fail_if(flag: bool, what: &str) -> Result<(), PlatformError> {
        if flag {
            Err(PlatformError::api(500, format!("{what} failed")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Platform for StubPlatform {
    async fn get_app_by_name(
        &self,
        name: &str,
        _space_guid: &str,
    ) -> Result<Option<AppRecord>, PlatformError> {
        self.record(format!("get_app:{name}"));
        Self::fail_if(self.failures.lookup, "app lookup")?;
        Ok(self.existing.clone().filter(|app| app.name == name))
    }

    async fn create_app(&self, request: &CreateAppRequest) -> Result<AppRecord, PlatformError> {
        self.record(format!("create_app:{}", request.name));
        Self::fail_if(self.failures.create_app, "create app")?;
        self.created.lock().unwrap().push(request.clone());
        Ok(AppRecord {
            guid: "app-guid".into(),
            name: request.name.clone(),
            space_guid: request.space_guid.clone(),
            existing: false,
        })
    }

    async fn list_shared_domains(&self) -> Result<Vec<SharedDomain>, PlatformError> {
        self.record("list_domains".into());
        Self::fail_if(self.failures.domains, "list domains")?;
        Ok(self.domains.clone())
    }

    async fn list_routes(&self, host: &str, domain_guid: &str) -> Result<Vec<Route>, PlatformError> {
        self.record(format!("list_routes:{host}"));
        Self::fail_if(self.failures.routes, "list routes")?;
        Ok(self
            .routes
            .iter()
            .filter(|r| r.host == host && r.domain_guid == domain_guid)
            .cloned()
            .collect())
    }

    async fn create_route(
        &self,
        host: &str,
        domain_guid: &str,
        _space_guid: &str,
    ) -> Result<Route, PlatformError> {
        self.record(format!("create_route:{host}"));
        Self::fail_if(self.failures.create_route, "create route")?;
        Ok(Route {
            guid: "route-new".into(),
            host: host.into(),
            domain_guid: domain_guid.into(),
        })
    }

    async fn associate_route(&self, app_guid: &str, route_guid: &str) -> Result<(), PlatformError> {
        self.record(format!("associate:{app_guid}:{route_guid}"));
        Self::fail_if(self.failures.associate, "associate route")
    }

    async fn upload_bits(&self, app_guid: &str, package: &Path) -> Result<(), PlatformError> {
        self.record(format!("upload:{app_guid}"));
        Self::fail_if(self.failures.upload, "upload")?;
        let bytes = std::fs::read(package).map_err(|e| PlatformError::Decode(e.to_string()))?;
        self.uploaded.lock().unwrap().push(bytes);
        Ok(())
    }

    async fn start_app(&self, app_guid: &str) -> Result<(), PlatformError> {
        self.record(format!("start:{app_guid}"));
        Self::fail_if(self.failures.start, "start")
    }

    async fn get_app_summary(&self, app_guid: &str) -> Result<AppSummary, PlatformError> {
        self.record(format!("summary:{app_guid}"));
        Self::fail_if(self.failures.summary, "summary")?;
        Ok(self.summary.clone())
    }
}

pub fn space_target() -> SpaceTarget {
    SpaceTarget {
        guid: "space-1".into(),
        name: "dev".into(),
        org: "acme".into(),
    }
}
