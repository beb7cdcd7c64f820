//! Compensation of a partially executed release.

use crate::config::{ReleaseSettings, RepositorySlug};
use crate::error::ReleaseError;
use crate::git::{Git, find_pull_request_number};
use crate::github::{PullRequestState, ReleaseHost};
use crate::plan::ReleasePlan;
use crate::process::CommandRunner;
use crate::publish::Npm;
use crate::state::{ExecutionLedger, OriginalRepositoryState, RollbackSummary};
use std::time::{Duration, Instant};

/// What a rollback did
#[derive(Debug)]
pub struct RollbackResult {
    /// Compensations that succeeded, in order
    pub rolled_back_operations: Vec<String>,
    /// Compensations that failed and were skipped
    pub warnings: Vec<String>,
    /// Pull request that was reopened and annotated
    pub pull_request: Option<u64>,
    /// Time spent
    pub duration: Duration,
    /// First failure that makes the rollback itself unsuccessful
    pub fatal: Option<ReleaseError>,
}

impl RollbackResult {
    /// Whether every mandatory compensation succeeded
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
    }

    /// Report form, without the error value
    pub fn summary(&self) -> RollbackSummary {
        RollbackSummary {
            rolled_back_operations: self.rolled_back_operations.clone(),
            warnings: self.warnings.clone(),
            error: self.fatal.as_ref().map(ToString::to_string),
        }
    }

    fn done(&mut self, operation: String) {
        log::info!("Rolled back: {operation}");
        self.rolled_back_operations.push(operation);
    }

    fn warn(&mut self, warning: String) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    fn fail(&mut self, context: &str, error: ReleaseError) {
        log::error!("{context}: {error}");
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }
}

/// Undoes what the ledger says has happened.
///
/// Individual compensations (tag deletion, unpublish, release deletion) only
/// warn on failure. Failing to restore the branch or to notify the pull
/// request makes the whole rollback fail, after every other step has run.
pub struct RollbackCoordinator<'a, R, H> {
    git: Git<R>,
    npm: Npm<R>,
    host: &'a H,
    repository: &'a RepositorySlug,
    run_url: Option<&'a str>,
    settings: &'a ReleaseSettings,
}

impl<'a, R, H> RollbackCoordinator<'a, R, H>
where
    R: CommandRunner,
    H: ReleaseHost,
{
    /// Coordinator running commands through `runner`
    pub fn new(
        runner: R,
        settings: &'a ReleaseSettings,
        repository: &'a RepositorySlug,
        run_url: Option<&'a str>,
        host: &'a H,
    ) -> Self {
        Self {
            git: Git::new(runner.clone(), &settings.root),
            npm: Npm::new(runner, &settings.registry),
            host,
            repository,
            run_url,
            settings,
        }
    }

    /// Compensate every recorded action of a failed release of `plan`
    pub async fn rollback(
        &self,
        plan: &ReleasePlan,
        ledger: &ExecutionLedger,
        original: &OriginalRepositoryState,
    ) -> RollbackResult {
        let start = Instant::now();
        let mut result = RollbackResult {
            rolled_back_operations: Vec::new(),
            warnings: Vec::new(),
            pull_request: None,
            duration: Duration::ZERO,
            fatal: None,
        };
        log::warn!("Rolling back releases (last completed phase: {})...", ledger.phase());

        let head_before = match self.git.rev_parse_head().await {
            Ok(head) => Some(head),
            Err(e) => {
                result.warn(format!("Could not read HEAD before rollback: {e}"));
                None
            }
        };

        self.remove_tags(ledger, &mut result).await;
        self.restore_branch(ledger, original, &mut result).await;
        self.unpublish(plan, &mut result).await;
        self.delete_releases(ledger, &mut result).await;
        self.notify_pull_request(plan, original, head_before.as_deref(), &mut result)
            .await;

        result.duration = start.elapsed();
        if result.is_success() {
            log::warn!("Rollback complete.");
        } else {
            log::error!("Rollback did not complete cleanly.");
        }
        result
    }

    async fn remove_tags(&self, ledger: &ExecutionLedger, result: &mut RollbackResult) {
        for tag in ledger.tags_created() {
            match self.git.delete_tag(tag).await {
                Ok(()) => result.done(format!("deleted tag {tag}")),
                Err(e) => result.warn(format!("Failed to delete tag {tag}: {e}")),
            }
            if !ledger.push_attempted() {
                continue;
            }
            match self.git.delete_remote_tag(&self.settings.remote, tag).await {
                Ok(()) => result.done(format!("deleted remote tag {tag}")),
                Err(e) => result.warn(format!("Failed to delete remote tag {tag}: {e}")),
            }
        }
    }

    async fn restore_branch(
        &self,
        ledger: &ExecutionLedger,
        original: &OriginalRepositoryState,
        result: &mut RollbackResult,
    ) {
        if let Err(e) = self.git.reset_hard(&original.revision).await {
            result.fail("Failed to reset to the original revision", e);
            return;
        }
        result.done(format!("reset {} to {}", original.branch, original.revision));

        if !ledger.push_attempted() {
            return;
        }
        match self.git.force_push(&self.settings.remote, &original.branch).await {
            Ok(()) => result.done(format!("force-pushed {}", original.branch)),
            Err(e) => result.fail("Failed to force-push the restored branch", e),
        }
    }

    async fn unpublish(&self, plan: &ReleasePlan, result: &mut RollbackResult) {
        for unit in plan.units() {
            let transition = unit.transition();
            let version = transition.next().to_string();
            match self
                .npm
                .unpublish(transition.directory(), unit.name(), &version)
                .await
            {
                Ok(()) => result.done(format!("unpublished {}", transition.tag())),
                Err(e) => result.warn(format!(
                    "Failed to unpublish {} (expected if it was never published): {e}",
                    transition.tag()
                )),
            }
        }
    }

    async fn delete_releases(&self, ledger: &ExecutionLedger, result: &mut RollbackResult) {
        for (name, id) in ledger.remote_release_ids() {
            match self.host.delete_release(self.repository, *id).await {
                Ok(()) => result.done(format!("deleted release {id} ({name})")),
                Err(e) => result.warn(format!("Failed to delete GitHub release for {name}: {e}")),
            }
        }
    }

    async fn notify_pull_request(
        &self,
        plan: &ReleasePlan,
        original: &OriginalRepositoryState,
        head_before: Option<&str>,
        result: &mut RollbackResult,
    ) {
        let mut candidates = vec![original.revision.as_str()];
        candidates.extend(head_before.filter(|head| *head != original.revision));

        let mut number = None;
        for revision in candidates {
            match self.git.commit_message(revision).await {
                Ok(message) => {
                    number = find_pull_request_number(&message);
                    if number.is_some() {
                        break;
                    }
                }
                Err(e) => result.warn(format!("Could not read commit {revision}: {e}")),
            }
        }
        let Some(number) = number else {
            log::info!("No pull request referenced; skipping notification");
            return;
        };

        let body = failure_comment(plan, self.run_url);
        let notified = futures_lite::future::try_zip(
            self.host
                .update_pull_request(self.repository, number, PullRequestState::Open),
            self.host.create_comment(self.repository, number, &body),
        )
        .await;
        match notified {
            Ok(_) => {
                result.pull_request = Some(number);
                result.done(format!("reopened and commented on #{number}"));
            }
            Err(e) => result.fail(&format!("Failed to notify pull request #{number}"), e),
        }
    }
}

/// Comment posted on the originating pull request
pub fn failure_comment(plan: &ReleasePlan, run_url: Option<&str>) -> String {
    let mut body = format!("⚠️ Release failed for: {}\n\n", plan.describe());
    if let Some(url) = run_url {
        body.push_str(&format!("See workflow details: {url}\n\n"));
    }
    body.push_str("This PR has been automatically reopened.");
    body
}
