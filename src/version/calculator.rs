//! Per-package bump computation from commit history.

use super::bump::{DefaultWhatBump, ReleaseChannel, WhatBump, next_version};
use crate::error::{Result, VersionError};
use crate::git::{ConventionalCommit, Git, relative_path, release_tag};
use crate::plan::{DependencyCommitWriter, DependencyRewriteSet, PackageIdentity, VersionTransition};
use crate::process::CommandRunner;
use crate::state::ExecutionLedger;
use crate::workspace::PackageManifest;
use semver::Version;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Decides each package's next version from the commits since its last release tag
#[derive(Clone)]
pub struct BumpCalculator<R> {
    git: Git<R>,
    root: PathBuf,
    classifier: Arc<dyn WhatBump>,
    channel: Option<ReleaseChannel>,
}

impl<R: CommandRunner> BumpCalculator<R> {
    /// Calculator reading history through `git` for the repository at `root`
    pub fn new(git: Git<R>, root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            root: root.into(),
            classifier: Arc::new(DefaultWhatBump),
            channel: None,
        }
    }

    /// Replace the bump classifier
    pub fn with_classifier(mut self, classifier: Arc<dyn WhatBump>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Steer every recommendation onto a release channel
    pub fn with_channel(mut self, channel: Option<ReleaseChannel>) -> Self {
        self.channel = channel;
        self
    }

    /// Private packages and the workspace root (while it declares workspaces) never release
    pub fn is_releasable(&self, manifest: &PackageManifest) -> bool {
        if manifest.is_private() {
            return false;
        }
        !(manifest.dir() == self.root.as_path() && manifest.declares_workspaces())
    }

    /// Conventional commits touching `dir` since the package's latest release tag
    pub async fn commits_since_last_release(&self, name: &str, dir: &Path) -> Result<Vec<ConventionalCommit>> {
        let range = self
            .git
            .latest_release(name)
            .await?
            .map(|version| format!("{}..HEAD", release_tag(name, &version)));
        let scope = relative_path(&self.root, dir);
        let commits = self.git.log(range.as_deref(), &scope).await?;
        log::debug!(
            "{name}: {} commit(s) in {} -- {scope}",
            commits.len(),
            range.as_deref().unwrap_or("HEAD")
        );
        Ok(commits.iter().map(ConventionalCommit::parse).collect())
    }

    /// Classify `commits` and apply the result to `current`
    pub fn transition_for(
        &self,
        identity: PackageIdentity,
        current: &Version,
        commits: &[ConventionalCommit],
    ) -> Option<VersionTransition> {
        let mut recommendation = self.classifier.recommend(commits)?;
        if let Some(channel) = self.channel {
            recommendation = channel.apply(recommendation, current);
        }
        let next = next_version(current, recommendation.release_type, &recommendation.reason)?;
        log::info!(
            "{}: {current} -> {next} ({})",
            identity.name,
            recommendation.reason
        );
        VersionTransition::new(identity, current.clone(), next)
    }

    /// Transition for one manifest, `None` when it has nothing to release
    pub async fn compute(&self, manifest: &PackageManifest) -> Result<Option<VersionTransition>> {
        if !self.is_releasable(manifest) {
            log::debug!("Skipping {}: private or workspace root", manifest.path().display());
            return Ok(None);
        }
        let name = manifest.require_name()?;
        let raw = manifest.require_version()?;
        let current = Version::parse(raw).map_err(|source| VersionError::ParseFailed {
            package: name.to_string(),
            version: raw.to_string(),
            source,
        })?;

        let commits = self.commits_since_last_release(name, manifest.dir()).await?;
        if commits.is_empty() {
            log::debug!("{name}: no commits since last release");
            return Ok(None);
        }

        let identity = PackageIdentity {
            name: name.to_string(),
            directory: manifest.dir().to_path_buf(),
        };
        Ok(self.transition_for(identity, &current, &commits))
    }

    /// Compute every manifest concurrently; results keep input order
    pub async fn compute_all(&self, manifests: Vec<PackageManifest>) -> Result<Vec<VersionTransition>> {
        let mut tasks = JoinSet::new();
        for (index, manifest) in manifests.into_iter().enumerate() {
            let calculator = self.clone();
            tasks.spawn(async move { (index, calculator.compute(&manifest).await) });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined?;
            results.push((index, result?));
        }
        results.sort_by_key(|(index, _)| *index);
        Ok(results.into_iter().filter_map(|(_, t)| t).collect())
    }

    /// Commit a manifest's dependency rewrites, then compute its bump.
    ///
    /// The commits land before the history is read so the bump's range
    /// includes them.
    pub async fn compute_triggered(
        &self,
        manifest: &mut PackageManifest,
        rewrites: &DependencyRewriteSet,
        writer: &DependencyCommitWriter<R>,
        ledger: &mut ExecutionLedger,
    ) -> Result<Option<VersionTransition>> {
        if !self.is_releasable(manifest) {
            return Ok(None);
        }
        if !rewrites.is_empty() {
            writer.commit_rewrites(manifest, rewrites, ledger).await?;
        }
        self.compute(manifest).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::RawCommit;
    use crate::process::SystemRunner;
    use crate::version::BumpRecommendation;
    use serde_json::json;

    fn calculator() -> BumpCalculator<SystemRunner> {
        BumpCalculator::new(Git::new(SystemRunner::new(), "/repo"), "/repo")
    }

    fn commit(subject: &str, body: &str) -> ConventionalCommit {
        ConventionalCommit::parse(&RawCommit {
            hash: "a".repeat(40),
            short_hash: "aaaaaaa".into(),
            date: "2024-01-01".into(),
            subject: subject.into(),
            body: body.into(),
        })
    }

    fn identity() -> PackageIdentity {
        PackageIdentity {
            name: "pkg".into(),
            directory: PathBuf::from("/repo/packages/pkg"),
        }
    }

    #[test]
    fn test_private_and_root_are_not_releasable() {
        let calc = calculator();
        let private = PackageManifest::from_value(
            "/repo/packages/a/package.json",
            json!({ "name": "a", "version": "1.0.0", "private": true }),
        );
        let root = PackageManifest::from_value(
            "/repo/package.json",
            json!({ "name": "root", "version": "1.0.0", "workspaces": ["packages/*"] }),
        );
        let single = PackageManifest::from_value(
            "/repo/package.json",
            json!({ "name": "root", "version": "1.0.0" }),
        );
        assert!(!calc.is_releasable(&private));
        assert!(!calc.is_releasable(&root));
        assert!(calc.is_releasable(&single));
    }

    #[tokio::test]
    async fn test_private_package_computes_nothing() {
        let manifest = PackageManifest::from_value(
            "/repo/packages/a/package.json",
            json!({ "name": "a", "version": "1.0.0", "private": true }),
        );
        assert_eq!(calculator().compute(&manifest).await.expect("compute"), None);
    }

    #[test]
    fn test_feature_bumps_minor() {
        let t = calculator()
            .transition_for(identity(), &Version::new(1, 2, 3), &[commit("feat: add x", "")])
            .expect("transition");
        assert_eq!(t.next(), &Version::new(1, 3, 0));
    }

    #[test]
    fn test_breaking_note_bumps_major() {
        let commits = [commit("fix: y", "BREAKING CHANGE: removed z")];
        let t = calculator()
            .transition_for(identity(), &Version::new(1, 2, 3), &commits)
            .expect("transition");
        assert_eq!(t.next(), &Version::new(2, 0, 0));
    }

    #[test]
    fn test_no_commits_no_transition() {
        assert!(calculator().transition_for(identity(), &Version::new(1, 0, 0), &[]).is_none());
    }

    #[test]
    fn test_prerelease_increments_instead_of_bumping() {
        let current = Version::parse("2.0.0-beta.5").expect("version");
        let t = calculator()
            .transition_for(identity(), &current, &[commit("feat: z", "")])
            .expect("transition");
        assert_eq!(t.next().to_string(), "2.0.0-beta.6");
    }

    #[test]
    fn test_channel_switch_resets_counter() {
        let current = Version::parse("2.0.0-beta.5").expect("version");
        let t = calculator()
            .with_channel(Some(ReleaseChannel::Rc))
            .transition_for(identity(), &current, &[commit("fix: z", "")])
            .expect("transition");
        assert_eq!(t.next().to_string(), "2.0.0-rc.0");
    }

    #[test]
    fn test_stable_channel_promotes_prerelease() {
        let current = Version::parse("2.0.0-rc.5").expect("version");
        let t = calculator()
            .with_channel(Some(ReleaseChannel::Stable))
            .transition_for(identity(), &current, &[commit("fix: z", "")])
            .expect("transition");
        assert_eq!(t.next(), &Version::new(2, 0, 0));
    }

    #[test]
    fn test_custom_classifier_declining_means_no_release() {
        struct Never;
        impl WhatBump for Never {
            fn recommend(&self, _: &[ConventionalCommit]) -> Option<BumpRecommendation> {
                None
            }
        }
        let calc = calculator().with_classifier(Arc::new(Never));
        assert!(calc
            .transition_for(identity(), &Version::new(1, 0, 0), &[commit("feat: a", "")])
            .is_none());
    }
}
