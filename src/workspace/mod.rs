//! npm workspace discovery and manifest I/O.

mod discovery;
mod manifest;

pub use discovery::{find_repo_root, workspace_package_paths};
pub use manifest::{DEPENDENCY_FIELDS, ManifestStore, PackageManifest, rewrite_range};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// All manifests of one repository, in discovery order
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    manifests: Vec<PackageManifest>,
}

impl Workspace {
    /// Discover and load every workspace manifest under `root`
    pub fn discover(root: &Path) -> Result<Self> {
        let manifests = workspace_package_paths(root)?
            .into_iter()
            .map(PackageManifest::load)
            .collect::<Result<Vec<_>>>()?;
        log::debug!("Discovered {} workspace manifest(s)", manifests.len());
        Ok(Self {
            root: root.to_path_buf(),
            manifests,
        })
    }

    /// Build from already-loaded manifests
    pub fn from_manifests(root: impl Into<PathBuf>, manifests: Vec<PackageManifest>) -> Self {
        Self {
            root: root.into(),
            manifests,
        }
    }

    /// Repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loaded manifests
    pub fn manifests(&self) -> &[PackageManifest] {
        &self.manifests
    }

    /// Manifest paths in discovery order
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.manifests.iter().map(|m| m.path().to_path_buf()).collect()
    }

    /// Whether `manifest` is the repository's root package.json
    pub fn is_root_manifest(&self, manifest: &PackageManifest) -> bool {
        manifest.path() == self.root.join("package.json")
    }
}
