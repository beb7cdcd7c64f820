//! End-to-end release run: snapshot, plan, execute, compensate.

use super::executor::TransactionalReleaseExecutor;
use super::rollback::RollbackCoordinator;
use crate::changelog::ChangelogGenerator;
use crate::config::{ReleaseSettings, RepositorySlug};
use crate::error::{ReleaseError, Result};
use crate::git::{Git, relative_path};
use crate::github::ReleaseHost;
use crate::plan::{
    BumpOrigin, DependencyCommitWriter, DependencyGraphScanner, DependencyRewriteSet, ReleasePlan,
    ReleasePlanBuilder, ReleaseUnit,
};
use crate::process::CommandRunner;
use crate::state::{ExecutionLedger, OriginalRepositoryState, ReleasePhase, RunOutcome, RunReport};
use crate::version::{BumpCalculator, ReleaseChannel};
use crate::workspace::Workspace;

/// Drives one release of a workspace
pub struct Releaser<R, C, H> {
    runner: R,
    settings: ReleaseSettings,
    repository: RepositorySlug,
    run_url: Option<String>,
    changelog: C,
    host: H,
    channel: Option<ReleaseChannel>,
}

impl<R, C, H> Releaser<R, C, H>
where
    R: CommandRunner,
    C: ChangelogGenerator,
    H: ReleaseHost,
{
    /// Releaser for the repository described by `settings`
    pub fn new(
        runner: R,
        settings: ReleaseSettings,
        repository: RepositorySlug,
        changelog: C,
        host: H,
    ) -> Self {
        Self {
            runner,
            settings,
            repository,
            run_url: None,
            changelog,
            host,
            channel: None,
        }
    }

    /// Link to the CI run, used in pull request comments
    pub fn with_run_url(mut self, run_url: Option<String>) -> Self {
        self.run_url = run_url;
        self
    }

    /// Force every bump onto a release channel
    pub fn with_channel(mut self, channel: Option<ReleaseChannel>) -> Self {
        self.channel = channel;
        self
    }

    /// Settings in use
    pub fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    /// Release everything that changed.
    ///
    /// `ledger` and `report` belong to the caller so they survive an error.
    /// A failure after the first durable effect is compensated before the
    /// original error is returned; if compensation fails too, the result is
    /// [`ReleaseError::RollbackFailed`].
    pub async fn run(&self, ledger: &mut ExecutionLedger, report: &mut RunReport) -> Result<RunOutcome> {
        let git = Git::new(self.runner.clone(), &self.settings.root);
        let original = OriginalRepositoryState::capture(&git, Some(&self.settings.branch)).await?;
        report.original = Some(original.clone());

        let workspace = Workspace::discover(&self.settings.root)?;
        let calculator = BumpCalculator::new(git.clone(), &self.settings.root).with_channel(self.channel);

        let direct = calculator.compute_all(workspace.manifests().to_vec()).await?;
        if direct.is_empty() {
            log::info!("No package changes detected. Nothing to release.");
            return Ok(RunOutcome::NothingToRelease);
        }

        let rewrites = DependencyGraphScanner::scan(workspace.manifests(), &direct);
        let provisional = ReleasePlan::new(
            direct
                .iter()
                .cloned()
                .map(|t| ReleaseUnit::new(t, DependencyRewriteSet::new(), BumpOrigin::Direct))
                .collect(),
        );

        let builder = ReleasePlanBuilder::new(
            calculator,
            DependencyCommitWriter::new(git.clone(), &self.settings.root),
        );
        let plan = match builder
            .build(direct, &rewrites, workspace.manifests(), ledger)
            .await
        {
            Ok(plan) => plan,
            Err(e) => {
                report.set_plan(&provisional);
                return self
                    .recover(e, &provisional, ledger, &original, &git, report)
                    .await;
            }
        };
        report.set_plan(&plan);
        log::info!("Releasing {} package(s): {}", plan.len(), plan.describe());

        let executor = TransactionalReleaseExecutor::new(
            self.runner.clone(),
            &self.settings,
            &self.repository,
            &self.changelog,
            &self.host,
        );
        match executor.execute(&plan, ledger).await {
            Ok(()) => Ok(RunOutcome::Released),
            Err(e) => self.recover(e, &plan, ledger, &original, &git, report).await,
        }
    }

    /// Undo as much as the failure point requires, then hand back the error
    async fn recover(
        &self,
        error: ReleaseError,
        plan: &ReleasePlan,
        ledger: &ExecutionLedger,
        original: &OriginalRepositoryState,
        git: &Git<R>,
        report: &mut RunReport,
    ) -> Result<RunOutcome> {
        log::error!("Release failed after {}: {error}", ledger.phase());

        let needs_rollback = ledger.has_durable_effects() || ledger.phase() >= ReleasePhase::ManifestsUpdated;
        if !needs_rollback {
            discard_working_tree_changes(git, ledger, &self.settings).await;
            return Err(error);
        }

        let coordinator = RollbackCoordinator::new(
            self.runner.clone(),
            &self.settings,
            &self.repository,
            self.run_url.as_deref(),
            &self.host,
        );
        let mut result = coordinator.rollback(plan, ledger, original).await;
        report.rollback = Some(result.summary());

        match result.fatal.take() {
            None => Err(error),
            Some(rollback) => Err(ReleaseError::RollbackFailed {
                original: Box::new(error),
                rollback: Box::new(rollback),
            }),
        }
    }
}

/// Best-effort restore of files written before anything durable happened
async fn discard_working_tree_changes<R: CommandRunner>(
    git: &Git<R>,
    ledger: &ExecutionLedger,
    settings: &ReleaseSettings,
) {
    if ledger.files_modified().is_empty() {
        return;
    }
    let paths: Vec<String> = ledger
        .files_modified()
        .iter()
        .map(|path| relative_path(&settings.root, path))
        .collect();
    if let Err(e) = git.checkout_paths(&paths).await {
        log::warn!("Could not discard working-tree changes: {e}");
    }
}
