//! The release state machine.

use crate::changelog::{ChangelogGenerator, ChangelogRequest, is_bare_header};
use crate::config::{ReleaseSettings, RepositorySlug};
use crate::error::{ChangelogError, Result};
use crate::git::{Git, relative_path};
use crate::github::ReleaseHost;
use crate::plan::{DependencyCommitWriter, ReleasePlan, ReleaseUnit};
use crate::process::CommandRunner;
use crate::publish::Npm;
use crate::state::{ExecutionLedger, ReleasePhase};
use crate::workspace::PackageManifest;

/// Message of the single commit carrying every manifest and changelog
pub const RELEASE_COMMIT_MESSAGE: &str = "chore: release [skip ci]";

/// Executes a [`ReleasePlan`] phase by phase, recording every durable action.
///
/// Phases run strictly in order and each one is marked complete in the ledger
/// only after all of its packages succeeded. Work inside a phase is sequential
/// across packages since they share one working tree and one release commit.
pub struct TransactionalReleaseExecutor<'a, R, C, H> {
    git: Git<R>,
    npm: Npm<R>,
    writer: DependencyCommitWriter<R>,
    changelog: &'a C,
    host: &'a H,
    repository: &'a RepositorySlug,
    settings: &'a ReleaseSettings,
}

impl<'a, R, C, H> TransactionalReleaseExecutor<'a, R, C, H>
where
    R: CommandRunner,
    C: ChangelogGenerator,
    H: ReleaseHost,
{
    /// Executor running commands through `runner`
    pub fn new(
        runner: R,
        settings: &'a ReleaseSettings,
        repository: &'a RepositorySlug,
        changelog: &'a C,
        host: &'a H,
    ) -> Self {
        let git = Git::new(runner.clone(), &settings.root);
        Self {
            writer: DependencyCommitWriter::new(git.clone(), &settings.root),
            npm: Npm::new(runner, &settings.registry),
            git,
            changelog,
            host,
            repository,
            settings,
        }
    }

    /// Run every phase from `PLANNED` to `DONE`
    pub async fn execute(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        self.verify_dry_run(plan).await?;
        ledger.complete(ReleasePhase::DryRunVerified);

        self.update_manifests(plan, ledger)?;
        ledger.complete(ReleasePhase::ManifestsUpdated);

        self.commit_dependency_updates(plan, ledger).await?;
        ledger.complete(ReleasePhase::DepCommitsDone);

        self.write_changelogs(plan, ledger).await?;
        ledger.complete(ReleasePhase::ChangelogsWritten);

        self.commit_and_tag(plan, ledger).await?;
        ledger.complete(ReleasePhase::CommittedAndTagged);

        self.publish_and_release(plan, ledger).await?;
        ledger.complete(ReleasePhase::PublishedAndReleased);

        ledger.complete(ReleasePhase::Done);
        log::info!("Released {}", plan.describe());
        Ok(())
    }

    /// Publish simulation for every package; nothing is written
    pub async fn verify_dry_run(&self, plan: &ReleasePlan) -> Result<()> {
        for unit in plan.units() {
            log::info!("Dry run: {}", unit.transition().tag());
            self.npm.dry_run(unit.transition().directory()).await?;
        }
        Ok(())
    }

    /// Write new versions and dependency ranges into the working tree
    pub fn update_manifests(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        for unit in plan.units() {
            let mut manifest = PackageManifest::load(unit.manifest_path())?;
            manifest.set_version(&unit.transition().next().to_string());
            for (dependency, version) in unit.rewrites().iter() {
                manifest.rewrite_dependency(dependency, version);
            }
            manifest.save()?;
            ledger.record_file(manifest.path());
            log::debug!("Updated {}", manifest.path().display());
        }
        Ok(())
    }

    /// Commit rewrites not already committed while planning
    pub async fn commit_dependency_updates(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        for unit in plan.units().iter().filter(|u| needs_dependency_commits(u)) {
            let mut manifest = PackageManifest::load(unit.manifest_path())?;
            self.writer
                .commit_rewrites(&mut manifest, unit.rewrites(), ledger)
                .await?;
        }
        Ok(())
    }

    /// Regenerate every package's changelog on disk
    pub async fn write_changelogs(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        for unit in plan.units() {
            let scope = relative_path(&self.settings.root, unit.transition().directory());
            let document = self
                .changelog
                .generate_document(unit.name(), unit.transition().next(), &scope)
                .await?;
            if is_bare_header(&document) {
                return Err(ChangelogError::Empty {
                    package: unit.name().to_string(),
                }
                .into());
            }
            let path = unit.changelog_path();
            std::fs::write(&path, document)?;
            ledger.record_file(&path);
            log::info!("Wrote {}", path.display());
        }
        Ok(())
    }

    /// Point of no return: release commit, one tag per package, push
    pub async fn commit_and_tag(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        let root = &self.settings.root;
        let paths: Vec<String> = plan
            .units()
            .iter()
            .flat_map(|u| [u.manifest_path(), u.changelog_path()])
            .map(|path| relative_path(root, &path))
            .collect();
        self.git.add(&paths).await?;

        self.sync_lockfile(ledger).await?;

        self.git.commit(RELEASE_COMMIT_MESSAGE).await?;
        ledger.record_commit();

        for unit in plan.units() {
            let tag = unit.transition().tag();
            self.git.create_annotated_tag(&tag).await?;
            ledger.record_tag(tag);
        }

        ledger.record_push_attempt();
        self.git
            .push_follow_tags(&self.settings.remote, &self.settings.branch)
            .await
    }

    /// Reinstall and commit the lockfile alone when it changed
    pub async fn sync_lockfile(&self, ledger: &mut ExecutionLedger) -> Result<()> {
        let Some(lockfile) = self.settings.lockfile.as_deref() else {
            return Ok(());
        };
        self.npm.install(&self.settings.root).await?;
        if !self.git.is_path_modified(lockfile).await? {
            log::debug!("{lockfile} unchanged");
            return Ok(());
        }

        let paths = [lockfile.to_string()];
        self.git.add(&paths).await?;
        self.git
            .commit_paths(&format!("chore(deps): sync {lockfile} [skip ci]"), &paths)
            .await?;
        ledger.record_commit();
        Ok(())
    }

    /// Publish each package, then create its remote release
    pub async fn publish_and_release(&self, plan: &ReleasePlan, ledger: &mut ExecutionLedger) -> Result<()> {
        self.git.fetch_tags().await?;

        for unit in plan.units() {
            let transition = unit.transition();
            let tag = transition.tag();

            self.npm.publish(transition.directory()).await?;
            ledger.record_publish(&tag);

            let previous = transition.previous_tag();
            let request = ChangelogRequest {
                package: unit.name().to_string(),
                version: transition.next().clone(),
                from: self.git.tag_exists(&previous).await?.then_some(previous),
                to: tag.clone(),
                path: relative_path(&self.settings.root, transition.directory()),
            };
            let notes = self.changelog.generate(&request).await?;

            let id = self
                .host
                .create_release(self.repository, &tag, &tag, &notes)
                .await?;
            ledger.record_remote_release(unit.name(), id);
        }
        Ok(())
    }
}

fn needs_dependency_commits(unit: &ReleaseUnit) -> bool {
    !unit.rewrites().is_empty() && !unit.dependencies_committed()
}
