//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use semver::Version;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use voidstone::changelog::{ChangelogGenerator, ChangelogRequest};
use voidstone::config::{ReleaseSettings, RepositorySlug};
use voidstone::error::{CommandError, HostError, Result};
use voidstone::github::{PullRequestState, ReleaseHost};
use voidstone::plan::{
    BumpOrigin, DependencyRewriteSet, PackageIdentity, ReleasePlan, ReleaseUnit,
    VersionTransition,
};
use voidstone::process::{CommandRunner, Invocation};
use voidstone::state::OriginalRepositoryState;

pub const ORIGINAL_REVISION: &str = "0000000000000000000000000000000000000001";
pub const HEAD_AFTER_RELEASE: &str = "0000000000000000000000000000000000000002";

#[derive(Debug, Clone)]
struct Rule {
    needles: Vec<String>,
    output: std::result::Result<String, String>,
}

impl Rule {
    fn matches(&self, line: &str) -> bool {
        self.needles.iter().all(|n| line.contains(n.as_str()))
    }
}

/// Records every invocation as `"<command line> (<cwd>)"` and answers from rules.
///
/// The first matching rule wins; unmatched commands succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<String>>>,
    rules: Arc<Mutex<Vec<Rule>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        let runner = Self::default();
        runner.respond(&["git rev-parse HEAD"], &format!("{ORIGINAL_REVISION}\n"));
        runner
    }

    /// Fail commands whose line contains every needle
    pub fn fail_when(&self, needles: &[&str]) {
        self.push(needles, Err("scripted failure".to_string()));
    }

    /// Answer commands whose line contains every needle with `stdout`
    pub fn respond(&self, needles: &[&str], stdout: &str) {
        self.push(needles, Ok(stdout.to_string()));
    }

    fn push(&self, needles: &[&str], output: std::result::Result<String, String>) {
        let rule = Rule {
            needles: needles.iter().map(|n| n.to_string()).collect(),
            output,
        };
        // Later rules take precedence over the defaults set in `new`
        self.rules.lock().unwrap().insert(0, rule);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, needle: &str) -> bool {
        self.calls().iter().any(|line| line.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|line| line.contains(needle)).count()
    }
}

impl CommandRunner for FakeRunner {
    async fn execute(&self, invocation: &Invocation) -> Result<String> {
        let line = format!("{invocation} ({})", invocation.cwd().display());
        self.calls.lock().unwrap().push(line.clone());

        let rule = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| rule.matches(&line))
            .cloned();
        match rule.map(|r| r.output) {
            None => Ok(String::new()),
            Some(Ok(stdout)) => Ok(stdout),
            Some(Err(stderr)) => Err(CommandError::Failed {
                command: invocation.to_string(),
                cwd: invocation.cwd().to_path_buf(),
                status: "exit code 1".to_string(),
                stdout: String::new(),
                stderr,
            }
            .into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    CreateRelease(String),
    DeleteRelease(u64),
    UpdatePullRequest(u64, PullRequestState),
    Comment(u64, String),
}

/// In-memory release host
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    calls: Arc<Mutex<Vec<HostCall>>>,
    next_id: Arc<Mutex<u64>>,
    fail_release_for: Arc<Mutex<Option<String>>>,
    fail_pull_request: Arc<Mutex<bool>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_release_for(&self, tag: &str) {
        *self.fail_release_for.lock().unwrap() = Some(tag.to_string());
    }

    pub fn fail_pull_request_updates(&self) {
        *self.fail_pull_request.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn status_error(operation: &str) -> voidstone::error::ReleaseError {
    HostError::Status {
        operation: operation.to_string(),
        status: 500,
        body: "scripted failure".to_string(),
    }
    .into()
}

impl ReleaseHost for FakeHost {
    async fn create_release(
        &self,
        _repo: &RepositorySlug,
        tag: &str,
        _title: &str,
        _body: &str,
    ) -> Result<u64> {
        if self.fail_release_for.lock().unwrap().as_deref() == Some(tag) {
            return Err(status_error("create release"));
        }
        self.record(HostCall::CreateRelease(tag.to_string()));
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        Ok(*id)
    }

    async fn delete_release(&self, _repo: &RepositorySlug, id: u64) -> Result<()> {
        self.record(HostCall::DeleteRelease(id));
        Ok(())
    }

    async fn update_pull_request(
        &self,
        _repo: &RepositorySlug,
        number: u64,
        state: PullRequestState,
    ) -> Result<()> {
        if *self.fail_pull_request.lock().unwrap() {
            return Err(status_error("update pull request"));
        }
        self.record(HostCall::UpdatePullRequest(number, state));
        Ok(())
    }

    async fn create_comment(&self, _repo: &RepositorySlug, number: u64, body: &str) -> Result<()> {
        self.record(HostCall::Comment(number, body.to_string()));
        Ok(())
    }
}

/// Changelog generator returning canned text
#[derive(Debug, Clone, Default)]
pub struct FakeChangelog {
    bare_for: Option<String>,
}

impl FakeChangelog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a header-only document for `package`
    pub fn bare_for(package: &str) -> Self {
        Self {
            bare_for: Some(package.to_string()),
        }
    }
}

impl ChangelogGenerator for FakeChangelog {
    async fn generate(&self, request: &ChangelogRequest) -> Result<String> {
        Ok(format!("## {} ({})\n\n* release notes\n", request.version, request.range()))
    }

    async fn generate_document(&self, package: &str, next: &Version, _path: &str) -> Result<String> {
        if self.bare_for.as_deref() == Some(package) {
            return Ok("# Changelog\n".to_string());
        }
        Ok(format!("# Changelog\n\n## {next}\n\n* changes in {package}\n"))
    }
}

/// Workspace root with one package per name under `packages/`
pub fn workspace(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_json(
        &dir.path().join("package.json"),
        &json!({ "name": "root", "private": true, "workspaces": ["packages/*"] }),
    );
    for name in names {
        write_json(
            &dir.path().join("packages").join(name).join("package.json"),
            &json!({ "name": name, "version": "1.0.0" }),
        );
    }
    dir
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap() + "\n").unwrap();
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn package_dir(root: &Path, name: &str) -> PathBuf {
    root.join("packages").join(name)
}

/// Plan releasing every name from 1.0.0 to 1.1.0
pub fn plan(root: &Path, names: &[&str]) -> ReleasePlan {
    ReleasePlan::new(
        names
            .iter()
            .map(|name| {
                let transition = VersionTransition::new(
                    PackageIdentity {
                        name: name.to_string(),
                        directory: package_dir(root, name),
                    },
                    Version::new(1, 0, 0),
                    Version::new(1, 1, 0),
                )
                .unwrap();
                ReleaseUnit::new(transition, DependencyRewriteSet::new(), BumpOrigin::Direct)
            })
            .collect(),
    )
}

pub fn settings(root: &Path) -> ReleaseSettings {
    ReleaseSettings::new(root, "main")
}

pub fn repository() -> RepositorySlug {
    RepositorySlug::parse("acme/widgets").unwrap()
}

pub fn original() -> OriginalRepositoryState {
    OriginalRepositoryState {
        revision: ORIGINAL_REVISION.to_string(),
        branch: "main".to_string(),
    }
}
