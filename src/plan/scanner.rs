//! Discovery of dependency entries that point at bumped packages.

use super::types::{DependencyRewriteMap, DependencyRewriteSet, VersionTransition};
use crate::workspace::{DEPENDENCY_FIELDS, PackageManifest, rewrite_range};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static NPM_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^npm:(@?[^@]+)(?:@.*)?$").expect("npm alias regex is valid")
});

static INLINE_VERSION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(@?[^@]+)@.+$").expect("inline version regex is valid"));

/// Maps every manifest to the dependency entries it must rewrite
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyGraphScanner;

impl DependencyGraphScanner {
    /// Scan `manifests` for entries resolving to a package in `transitions`.
    ///
    /// Manifests without a name are skipped; when two manifests share a name
    /// the first one scanned wins.
    pub fn scan(manifests: &[PackageManifest], transitions: &[VersionTransition]) -> DependencyRewriteMap {
        let targets: HashMap<&str, String> = transitions
            .iter()
            .map(|t| (t.name(), t.next().to_string()))
            .collect();
        let mut map = DependencyRewriteMap::new();
        let mut seen = HashSet::new();

        for manifest in manifests {
            let Some(owner) = manifest.name() else {
                log::warn!("Skipping {}: no package name", manifest.path().display());
                continue;
            };
            // Owners are claimed even when they need no rewrites
            if !seen.insert(owner) {
                log::warn!(
                    "Duplicate package name '{owner}' at {}; keeping the first manifest",
                    manifest.path().display()
                );
                continue;
            }
            let rewrites = Self::scan_manifest(manifest, &targets);
            if !rewrites.is_empty() {
                map.insert(owner, rewrites);
            }
        }
        map
    }

    fn scan_manifest(manifest: &PackageManifest, targets: &HashMap<&str, String>) -> DependencyRewriteSet {
        let mut rewrites = DependencyRewriteSet::new();
        for field in DEPENDENCY_FIELDS {
            let Some(section) = manifest.dependency_section(field) else {
                continue;
            };
            for (raw_key, raw_value) in section {
                if let Some((key, next)) = resolve_entry(raw_key, raw_value, targets) {
                    rewrites.insert(key, next);
                }
            }
        }
        rewrites
    }
}

/// Resolve one dependency entry to `(manifest key, target version)`
fn resolve_entry(raw_key: &str, raw_value: &Value, targets: &HashMap<&str, String>) -> Option<(String, String)> {
    if raw_value.is_array() || raw_value.is_object() {
        return None;
    }
    let key = raw_key.trim();
    let value = raw_value.as_str().map(str::trim).unwrap_or_default();

    let mut candidates = vec![key.to_string()];
    if let Some(rest) = value.strip_prefix("npm:") {
        if !rest.contains('@') {
            return None;
        }
        candidates.push(aliased_package(value)?);
    }
    if let Some(caps) = INLINE_VERSION_KEY.captures(key) {
        candidates.push(caps[1].to_string());
    }

    let next = candidates
        .iter()
        .find_map(|name| targets.get(name.as_str()))?;

    // Path, git and URL specs pin something other than a registry version.
    rewrite_range(value, next)?;

    let current = effective_version(value);
    if !current.is_empty() && current == next {
        return None;
    }
    Some((key.to_string(), next.clone()))
}

/// Real package name behind an `npm:<name>@<range>` alias
fn aliased_package(value: &str) -> Option<String> {
    NPM_ALIAS.captures(value).map(|caps| caps[1].to_string())
}

/// Version a dependency value currently pins, with protocol and range prefixes removed
fn effective_version(value: &str) -> &str {
    let value = match value.strip_prefix("npm:") {
        Some(rest) => match rest.rfind('@') {
            Some(at) if at > 0 => &rest[at + 1..],
            _ => "",
        },
        None => value.strip_prefix("workspace:").unwrap_or(value),
    };
    value.trim_start_matches(['^', '~'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PackageIdentity;
    use semver::Version;
    use serde_json::json;
    use std::path::PathBuf;

    fn manifest(name: &str, body: Value) -> PackageManifest {
        let mut value = body;
        if let Some(object) = value.as_object_mut() {
            object.insert("name".into(), json!(name));
            object.insert("version".into(), json!("1.0.0"));
        }
        PackageManifest::from_value(format!("/repo/packages/{name}/package.json"), value)
    }

    fn bump(name: &str, current: &str, next: &str) -> VersionTransition {
        VersionTransition::new(
            PackageIdentity {
                name: name.into(),
                directory: PathBuf::from(format!("/repo/packages/{name}")),
            },
            Version::parse(current).expect("current"),
            Version::parse(next).expect("next"),
        )
        .expect("transition")
    }

    fn pairs(map: &DependencyRewriteMap, package: &str) -> Vec<(String, String)> {
        map.get(package)
            .map(|set| set.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_external_dependencies_are_ignored() {
        let manifests = [manifest("pkg-a", json!({ "dependencies": { "external-pkg": "1.0.0" } }))];
        let map = DependencyGraphScanner::scan(&manifests, &[bump("pkg-b", "1.0.0", "1.1.0")]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_all_dependency_fields() {
        let manifests = [manifest(
            "pkg-a",
            json!({
                "dependencies": { "pkg-b": "1.0.0" },
                "devDependencies": { "pkg-c": "2.0.0" },
                "peerDependencies": { "pkg-d": "3.0.0" },
                "optionalDependencies": { "pkg-e": "4.0.0" }
            }),
        )];
        let bumps = [
            bump("pkg-b", "1.0.0", "1.1.0"),
            bump("pkg-c", "2.0.0", "2.1.0"),
            bump("pkg-d", "3.0.0", "3.1.0"),
            bump("pkg-e", "4.0.0", "4.1.0"),
        ];
        let map = DependencyGraphScanner::scan(&manifests, &bumps);
        assert_eq!(
            pairs(&map, "pkg-a"),
            vec![
                ("pkg-b".into(), "1.1.0".into()),
                ("pkg-c".into(), "2.1.0".into()),
                ("pkg-d".into(), "3.1.0".into()),
                ("pkg-e".into(), "4.1.0".into()),
            ]
        );
    }

    #[test]
    fn test_circular_dependencies() {
        let manifests = [
            manifest("pkg-a", json!({ "dependencies": { "pkg-b": "1.0.0" } })),
            manifest("pkg-b", json!({ "dependencies": { "pkg-a": "1.0.0" } })),
        ];
        let bumps = [bump("pkg-a", "1.0.0", "1.1.0"), bump("pkg-b", "1.0.0", "1.1.0")];
        let map = DependencyGraphScanner::scan(&manifests, &bumps);
        assert_eq!(pairs(&map, "pkg-a"), vec![("pkg-b".into(), "1.1.0".into())]);
        assert_eq!(pairs(&map, "pkg-b"), vec![("pkg-a".into(), "1.1.0".into())]);
    }

    #[test]
    fn test_duplicate_entries_across_fields_collapse() {
        let manifests = [manifest(
            "pkg-a",
            json!({
                "dependencies": { "pkg-b": "1.0.0" },
                "devDependencies": { "pkg-b": "1.0.0" },
                "peerDependencies": { "pkg-b": "^1.0.0" }
            }),
        )];
        let map = DependencyGraphScanner::scan(&manifests, &[bump("pkg-b", "1.0.0", "1.1.0")]);
        assert_eq!(pairs(&map, "pkg-a"), vec![("pkg-b".into(), "1.1.0".into())]);
    }

    #[test]
    fn test_workspace_protocol_values() {
        let manifests = [manifest(
            "pkg-a",
            json!({ "dependencies": { "pkg-b": "workspace:^1.0.0", "pkg-c": "workspace:*" } }),
        )];
        let bumps = [bump("pkg-b", "1.0.0", "1.1.0"), bump("pkg-c", "1.0.0", "1.1.0")];
        let map = DependencyGraphScanner::scan(&manifests, &bumps);
        assert_eq!(
            pairs(&map, "pkg-a"),
            vec![("pkg-b".into(), "1.1.0".into()), ("pkg-c".into(), "1.1.0".into())]
        );
    }

    #[test]
    fn test_npm_alias_resolves_to_real_package_and_keeps_key() {
        let manifests = [manifest(
            "pkg-a",
            json!({ "dependencies": { "alias@2.0": "npm:@scope/pkg-b@1.0.0", "bare": "npm:pkg-b" } }),
        )];
        let map = DependencyGraphScanner::scan(&manifests, &[bump("@scope/pkg-b", "1.0.0", "2.0.0")]);
        assert_eq!(pairs(&map, "pkg-a"), vec![("alias@2.0".into(), "2.0.0".into())]);
    }

    #[test]
    fn test_inline_version_key_falls_back_to_stripped_name() {
        let manifests = [manifest("pkg-a", json!({ "dependencies": { "pkg-b@1": "^1.0.0" } }))];
        let map = DependencyGraphScanner::scan(&manifests, &[bump("pkg-b", "1.0.0", "1.1.0")]);
        assert_eq!(pairs(&map, "pkg-a"), vec![("pkg-b@1".into(), "1.1.0".into())]);
    }

    #[test]
    fn test_non_scalar_and_pinned_values_are_skipped() {
        let manifests = [manifest(
            "pkg-a",
            json!({
                "dependencies": { "pkg-b": ["1.0.0"], "pkg-c": { "version": "1.0.0" }, "pkg-d": "file:../d" }
            }),
        )];
        let bumps = [
            bump("pkg-b", "1.0.0", "1.1.0"),
            bump("pkg-c", "1.0.0", "1.1.0"),
            bump("pkg-d", "1.0.0", "1.1.0"),
        ];
        assert!(DependencyGraphScanner::scan(&manifests, &bumps).is_empty());
    }

    #[test]
    fn test_rescan_after_rewrite_is_empty() {
        let mut manifests = vec![manifest(
            "pkg-a",
            json!({
                "dependencies": { "pkg-b": "~1.0.0", "alias": "npm:pkg-c@1.0.0" },
                "devDependencies": { "pkg-d": "workspace:*" }
            }),
        )];
        let bumps = [
            bump("pkg-b", "1.0.0", "1.1.0"),
            bump("pkg-c", "1.0.0", "2.0.0"),
            bump("pkg-d", "0.1.0", "0.2.0"),
        ];
        let first = DependencyGraphScanner::scan(&manifests, &bumps);
        assert_eq!(first.get("pkg-a").map(|s| s.len()), Some(3));

        for (key, version) in first.get("pkg-a").expect("rewrites").iter() {
            assert!(manifests[0].rewrite_dependency(key, version));
        }
        assert!(DependencyGraphScanner::scan(&manifests, &bumps).is_empty());
    }

    #[test]
    fn test_duplicate_owner_name_first_wins() {
        let manifests = [
            manifest("pkg-a", json!({ "dependencies": { "pkg-b": "1.0.0" } })),
            manifest("pkg-a", json!({ "dependencies": { "pkg-c": "1.0.0" } })),
        ];
        let bumps = [bump("pkg-b", "1.0.0", "1.1.0"), bump("pkg-c", "1.0.0", "1.1.0")];
        let map = DependencyGraphScanner::scan(&manifests, &bumps);
        assert_eq!(map.len(), 1);
        assert_eq!(pairs(&map, "pkg-a"), vec![("pkg-b".into(), "1.1.0".into())]);
    }

    #[test]
    fn test_duplicate_owner_without_rewrites_still_claims_the_name() {
        let manifests = [
            manifest("dup", json!({ "dependencies": { "external-pkg": "1.0.0" } })),
            manifest("dup", json!({ "dependencies": { "pkg-b": "1.0.0" } })),
        ];
        let map = DependencyGraphScanner::scan(&manifests, &[bump("pkg-b", "1.0.0", "1.1.0")]);
        assert!(map.is_empty());
        assert!(map.get("dup").is_none());
    }
}
