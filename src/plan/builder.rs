//! Merges direct and dependency-triggered bumps into one release plan.

use super::dependency_commits::DependencyCommitWriter;
use super::types::{BumpOrigin, DependencyRewriteMap, ReleasePlan, ReleaseUnit, VersionTransition};
use crate::error::Result;
use crate::process::CommandRunner;
use crate::state::ExecutionLedger;
use crate::version::BumpCalculator;
use crate::workspace::PackageManifest;
use std::collections::HashSet;
use std::path::Path;

/// Builds the final [`ReleasePlan`]
pub struct ReleasePlanBuilder<R> {
    calculator: BumpCalculator<R>,
    writer: DependencyCommitWriter<R>,
}

impl<R: CommandRunner> ReleasePlanBuilder<R> {
    /// Builder computing triggered bumps with `calculator`
    pub fn new(calculator: BumpCalculator<R>, writer: DependencyCommitWriter<R>) -> Self {
        Self { calculator, writer }
    }

    /// Direct units first (with their rewrites), then triggered units in map order.
    ///
    /// A triggered package whose manifest cannot be located or re-read is left
    /// out with a warning. Dependency commits made for triggered packages are
    /// recorded in `ledger`; a failing commit aborts the build.
    pub async fn build(
        &self,
        direct: Vec<VersionTransition>,
        rewrites: &DependencyRewriteMap,
        manifests: &[PackageManifest],
        ledger: &mut ExecutionLedger,
    ) -> Result<ReleasePlan> {
        let direct_names: HashSet<String> = direct.iter().map(|t| t.name().to_string()).collect();
        let mut units: Vec<ReleaseUnit> = direct
            .into_iter()
            .map(|transition| {
                let set = rewrites.get(transition.name()).cloned().unwrap_or_default();
                ReleaseUnit::new(transition, set, BumpOrigin::Direct)
            })
            .collect();

        for (package, set) in rewrites.iter() {
            if direct_names.contains(package) {
                continue;
            }
            let Some(path) = locate(manifests, package) else {
                log::warn!("No manifest found for {package}; skipping triggered bump");
                continue;
            };
            let mut manifest = match PackageManifest::load(path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    log::warn!("Skipping triggered bump for {package}: {e}");
                    continue;
                }
            };

            let transition = self
                .calculator
                .compute_triggered(&mut manifest, set, &self.writer, ledger)
                .await?;
            if let Some(transition) = transition {
                log::info!("{package}: triggered by dependency updates");
                units.push(
                    ReleaseUnit::new(transition, set.clone(), BumpOrigin::Triggered)
                        .with_dependencies_committed(),
                );
            }
        }

        Ok(ReleasePlan::new(units))
    }
}

/// Path of the first discovered manifest named `package`
fn locate<'a>(manifests: &'a [PackageManifest], package: &str) -> Option<&'a Path> {
    let mut matches = manifests.iter().filter(|m| m.name() == Some(package));
    let first = matches.next()?;
    if matches.next().is_some() {
        log::warn!(
            "Several manifests are named {package}; using {}",
            first.path().display()
        );
    }
    Some(first.path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locate_prefers_first_discovered_manifest() {
        let manifests = vec![
            PackageManifest::from_value("/repo/packages/a/package.json", json!({ "name": "a" })),
            PackageManifest::from_value("/repo/fixtures/a/package.json", json!({ "name": "a" })),
            PackageManifest::from_value("/repo/packages/b/package.json", json!({ "name": "b" })),
        ];
        assert_eq!(
            locate(&manifests, "a"),
            Some(Path::new("/repo/packages/a/package.json"))
        );
        assert_eq!(locate(&manifests, "c"), None);
    }
}
