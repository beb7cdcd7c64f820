//! Release plan data model.

use semver::Version;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A releasable package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIdentity {
    /// Package name as published (may be scoped)
    pub name: String,
    /// Directory holding the package's manifest
    pub directory: PathBuf,
}

/// A package's move from one version to a different one.
///
/// Constructed only through [`VersionTransition::new`], which refuses no-op
/// transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionTransition {
    name: String,
    current: Version,
    next: Version,
    directory: PathBuf,
}

impl VersionTransition {
    /// `None` when `next == current`
    pub fn new(identity: PackageIdentity, current: Version, next: Version) -> Option<Self> {
        (current != next).then_some(Self {
            name: identity.name,
            current,
            next,
            directory: identity.directory,
        })
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version before the release
    pub fn current(&self) -> &Version {
        &self.current
    }

    /// Version being released
    pub fn next(&self) -> &Version {
        &self.next
    }

    /// Package directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Tag for the version being released
    pub fn tag(&self) -> String {
        crate::git::release_tag(&self.name, &self.next)
    }

    /// Tag of the version being replaced
    pub fn previous_tag(&self) -> String {
        crate::git::release_tag(&self.name, &self.current)
    }
}

/// Dependency entries of one manifest that must point at new versions.
///
/// Keys are the manifest keys exactly as written (aliases included).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyRewriteSet {
    entries: Vec<(String, String)>,
}

impl DependencyRewriteSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rewrite; a repeated key keeps its position and takes the new version
    pub fn insert(&mut self, key: impl Into<String>, version: impl Into<String>) {
        let key = key.into();
        let version = version.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = version,
            None => self.entries.push((key, version)),
        }
    }

    /// Target version for a manifest key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `(manifest key, target version)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// No rewrites
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of rewrites
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DependencyRewriteSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Rewrite sets keyed by the package owning each manifest, in scan order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyRewriteMap {
    entries: Vec<(String, DependencyRewriteSet)>,
}

impl DependencyRewriteMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package's rewrites; returns `false` if the package was already present
    pub fn insert(&mut self, package: impl Into<String>, rewrites: DependencyRewriteSet) -> bool {
        let package = package.into();
        if self.entries.iter().any(|(p, _)| *p == package) {
            return false;
        }
        self.entries.push((package, rewrites));
        true
    }

    /// Rewrites for one package
    pub fn get(&self, package: &str) -> Option<&DependencyRewriteSet> {
        self.entries
            .iter()
            .find(|(p, _)| p == package)
            .map(|(_, s)| s)
    }

    /// `(package, rewrites)` pairs in scan order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DependencyRewriteSet)> {
        self.entries.iter().map(|(p, s)| (p.as_str(), s))
    }

    /// No package needs rewrites
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of packages with rewrites
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Why a unit is being released
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpOrigin {
    /// The package's own history changed
    Direct,
    /// Only a dependency changed version
    Triggered,
}

/// One package's complete release instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseUnit {
    transition: VersionTransition,
    rewrites: DependencyRewriteSet,
    origin: BumpOrigin,
    dependencies_committed: bool,
}

impl ReleaseUnit {
    /// Unit whose dependency rewrites (if any) still need committing
    pub fn new(transition: VersionTransition, rewrites: DependencyRewriteSet, origin: BumpOrigin) -> Self {
        Self {
            transition,
            rewrites,
            origin,
            dependencies_committed: false,
        }
    }

    /// Mark the dependency rewrites as already committed during planning
    pub fn with_dependencies_committed(mut self) -> Self {
        self.dependencies_committed = true;
        self
    }

    /// Version transition
    pub fn transition(&self) -> &VersionTransition {
        &self.transition
    }

    /// Dependency rewrites for this unit's manifest
    pub fn rewrites(&self) -> &DependencyRewriteSet {
        &self.rewrites
    }

    /// Direct or triggered
    pub fn origin(&self) -> BumpOrigin {
        self.origin
    }

    /// Rewrites were committed while planning
    pub fn dependencies_committed(&self) -> bool {
        self.dependencies_committed
    }

    /// Package name
    pub fn name(&self) -> &str {
        self.transition.name()
    }

    /// Manifest path
    pub fn manifest_path(&self) -> PathBuf {
        self.transition.directory().join("package.json")
    }

    /// Changelog path
    pub fn changelog_path(&self) -> PathBuf {
        self.transition.directory().join("CHANGELOG.md")
    }
}

/// Finalized, read-only list of units to release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleasePlan {
    units: Vec<ReleaseUnit>,
}

impl ReleasePlan {
    /// Freeze a list of units
    pub fn new(units: Vec<ReleaseUnit>) -> Self {
        Self { units }
    }

    /// Units in release order
    pub fn units(&self) -> &[ReleaseUnit] {
        &self.units
    }

    /// Unit for a package
    pub fn find(&self, name: &str) -> Option<&ReleaseUnit> {
        self.units.iter().find(|u| u.name() == name)
    }

    /// Nothing to release
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// `name@next` for every unit, comma separated
    pub fn describe(&self) -> String {
        self.units
            .iter()
            .map(|u| u.transition().tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(name: &str) -> PackageIdentity {
        PackageIdentity {
            name: name.into(),
            directory: PathBuf::from(format!("/repo/packages/{name}")),
        }
    }

    #[test]
    fn test_no_op_transition_is_never_built() {
        let v = Version::new(1, 0, 0);
        assert!(VersionTransition::new(identity("a"), v.clone(), v).is_none());
    }

    #[test]
    fn test_transition_tags() {
        let t = VersionTransition::new(identity("@s/a"), Version::new(1, 0, 0), Version::new(1, 1, 0))
            .expect("transition");
        assert_eq!(t.tag(), "@s/a@1.1.0");
        assert_eq!(t.previous_tag(), "@s/a@1.0.0");
    }

    #[test]
    fn test_rewrite_set_overwrites_in_place() {
        let mut set = DependencyRewriteSet::new();
        set.insert("a", "1.0.0");
        set.insert("b", "2.0.0");
        set.insert("a", "1.1.0");
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![("a", "1.1.0"), ("b", "2.0.0")]);
    }

    #[test]
    fn test_rewrite_map_first_wins() {
        let mut map = DependencyRewriteMap::new();
        assert!(map.insert("pkg", [("a", "1.0.0")].into_iter().collect()));
        assert!(!map.insert("pkg", [("a", "9.0.0")].into_iter().collect()));
        assert_eq!(map.get("pkg").and_then(|s| s.get("a")), Some("1.0.0"));
    }
}
