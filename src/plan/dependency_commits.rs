//! One commit per dependency rewrite, made before a triggered bump is computed.

use super::types::DependencyRewriteSet;
use crate::error::Result;
use crate::git::{Git, relative_path};
use crate::process::CommandRunner;
use crate::state::ExecutionLedger;
use crate::workspace::PackageManifest;
use std::path::{Path, PathBuf};

/// Writes dependency rewrites into a manifest and commits each one separately
#[derive(Debug, Clone)]
pub struct DependencyCommitWriter<R> {
    git: Git<R>,
    root: PathBuf,
}

impl<R: CommandRunner> DependencyCommitWriter<R> {
    /// Writer committing through `git`, naming paths relative to `root`
    pub fn new(git: Git<R>, root: impl Into<PathBuf>) -> Self {
        Self {
            git,
            root: root.into(),
        }
    }

    /// Commit message for one rewrite
    pub fn message(&self, dependency: &str, version: &str, package_dir: &Path) -> String {
        format!(
            "chore(deps): bump {dependency} to v{version} in {}",
            relative_path(&self.root, package_dir)
        )
    }

    /// Apply and commit every rewrite in order.
    ///
    /// Each commit is recorded in `ledger` as soon as it exists. The first
    /// failure aborts the sequence; commits already made stay recorded.
    /// Rewrites for dependencies the manifest does not declare are skipped.
    pub async fn commit_rewrites(
        &self,
        manifest: &mut PackageManifest,
        rewrites: &DependencyRewriteSet,
        ledger: &mut ExecutionLedger,
    ) -> Result<usize> {
        let dir = manifest.dir().to_path_buf();
        let git = self.git.at(&dir);
        let mut made = 0;

        for (dependency, version) in rewrites.iter() {
            if manifest.rewrite_dependency(dependency, version) {
                manifest.save()?;
                ledger.record_file(manifest.path());
            } else if !manifest.declares_at(dependency, version) {
                log::warn!(
                    "{} does not depend on {dependency}; skipping its dependency commit",
                    manifest.path().display()
                );
                continue;
            }
            git.add(&["package.json".to_string()]).await?;
            git.commit_allow_empty(&self.message(dependency, version, &dir))
                .await?;
            ledger.record_commit();
            made += 1;
        }

        if made > 0 {
            log::info!(
                "Committed {made} dependency update(s) for {}",
                manifest.name().unwrap_or("<unnamed>")
            );
        }
        Ok(made)
    }
}
