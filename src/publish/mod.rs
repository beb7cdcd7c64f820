//! Registry operations for workspace packages.
//!
//! Everything goes through the `npm` executable via [`CommandRunner`], with
//! the package directory passed explicitly as the working directory.

use crate::error::Result;
use crate::process::{CommandRunner, Invocation, OutputMode};
use std::path::{Path, PathBuf};

/// npm client bound to one registry
#[derive(Debug, Clone)]
pub struct Npm<R> {
    runner: R,
    registry: String,
}

impl<R: CommandRunner> Npm<R> {
    /// Client publishing to `registry`
    pub fn new(runner: R, registry: impl Into<String>) -> Self {
        Self {
            runner,
            registry: registry.into(),
        }
    }

    /// Registry URL
    pub fn registry(&self) -> &str {
        &self.registry
    }

    fn invocation(&self, cwd: &Path) -> Invocation {
        Invocation::npm(PathBuf::from(cwd))
    }

    /// Simulate a publish without uploading anything
    pub async fn dry_run(&self, package_dir: &Path) -> Result<()> {
        self.runner
            .execute(
                &self
                    .invocation(package_dir)
                    .args(["publish", "--dry-run", "--registry", &self.registry])
                    .mode(OutputMode::Quiet),
            )
            .await
            .map(drop)
    }

    /// Publish the package in `package_dir`
    pub async fn publish(&self, package_dir: &Path) -> Result<()> {
        self.runner
            .execute(
                &self
                    .invocation(package_dir)
                    .args(["publish", "--registry", &self.registry])
                    .mode(OutputMode::Inherit),
            )
            .await
            .map(drop)
    }

    /// Remove `name@version` from the registry
    pub async fn unpublish(&self, package_dir: &Path, name: &str, version: &str) -> Result<()> {
        self.runner
            .execute(
                &self
                    .invocation(package_dir)
                    .arg("unpublish")
                    .arg(format!("{name}@{version}"))
                    .args(["--registry", &self.registry])
                    .mode(OutputMode::Quiet),
            )
            .await
            .map(drop)
    }

    /// Reinstall at the workspace root so the lockfile reflects rewritten manifests
    pub async fn install(&self, root: &Path) -> Result<()> {
        self.runner
            .execute(&self.invocation(root).arg("install").mode(OutputMode::Inherit))
            .await
            .map(drop)
    }
}
