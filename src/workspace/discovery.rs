//! Repository root and workspace package discovery.

use super::manifest::ManifestStore;
use crate::error::{ReleaseError, Result, WorkspaceError};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Nearest directory at or above `start` that contains a package.json
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join("package.json").is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            WorkspaceError::RootNotFound {
                start: start.to_path_buf(),
            }
            .into()
        })
}

/// Manifest paths of every workspace package, sorted.
///
/// Patterns prefixed with `!` exclude matches. Falls back to the root
/// manifest when the root declares no workspaces or nothing matches.
pub fn workspace_package_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let root_manifest = root.join("package.json");
    let value = ManifestStore::read(&root_manifest)?;
    let patterns = workspace_patterns(&root_manifest, &value)?;

    let (excludes, includes): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let mut excluded = Vec::new();
    for pattern in excludes {
        excluded.extend(expand(root, pattern.trim_start_matches('!'))?);
    }

    let mut paths = Vec::new();
    for pattern in includes {
        for path in expand(root, pattern)? {
            if !excluded.contains(&path) && !paths.contains(&path) {
                paths.push(path);
            }
        }
    }
    paths.sort();

    if paths.is_empty() {
        log::debug!("No workspace packages matched; using {}", root_manifest.display());
        return Ok(vec![root_manifest]);
    }
    Ok(paths)
}

fn workspace_patterns(path: &Path, manifest: &Value) -> Result<Vec<String>> {
    let invalid = |reason: &str| WorkspaceError::InvalidWorkspaces {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    match manifest.get("workspaces") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ReleaseError::from(invalid("every workspace must be a string")))
            })
            .collect(),
        Some(_) => Err(invalid("must be an array").into()),
    }
}

fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = pattern.trim().trim_end_matches('/');
    let full = root.join(pattern).join("package.json");
    let full = full.to_string_lossy();
    let entries = glob::glob(&full).map_err(|e| WorkspaceError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;
    Ok(entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable workspace entry: {e}");
                None
            }
        })
        .filter(|path| !path.components().any(|c| c.as_os_str() == "node_modules"))
        .filter(|path| path.is_file())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, body: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, body).expect("write");
    }

    #[test]
    fn test_find_repo_root_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("package.json"), "{}");
        let nested = dir.path().join("packages/a/src");
        std::fs::create_dir_all(&nested).expect("mkdir");
        assert_eq!(find_repo_root(&nested).expect("root"), dir.path());
    }

    #[test]
    fn test_workspace_globs_sorted_with_exclusions() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("package.json"),
            r#"{"name":"root","workspaces":["packages/*","!packages/skip"]}"#,
        );
        for name in ["b", "a", "skip"] {
            write(&dir.path().join(format!("packages/{name}/package.json")), "{}");
        }
        let paths = workspace_package_paths(dir.path()).expect("paths");
        assert_eq!(
            paths,
            vec![
                dir.path().join("packages/a/package.json"),
                dir.path().join("packages/b/package.json"),
            ]
        );
    }

    #[test]
    fn test_falls_back_to_root_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("package.json"), r#"{"name":"solo","version":"1.0.0"}"#);
        let paths = workspace_package_paths(dir.path()).expect("paths");
        assert_eq!(paths, vec![dir.path().join("package.json")]);
    }

    #[test]
    fn test_rejects_non_array_workspaces() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("package.json"),
            r#"{"name":"root","workspaces":{"packages":["a"]}}"#,
        );
        let err = workspace_package_paths(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::Workspace(WorkspaceError::InvalidWorkspaces { .. })
        ));
    }

    #[test]
    fn test_rejects_non_string_workspace_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("package.json"), r#"{"workspaces":["a", 3]}"#);
        assert!(workspace_package_paths(dir.path()).is_err());
    }
}
