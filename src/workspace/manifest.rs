//! package.json reading, writing and dependency range rewriting.

use crate::error::{Result, WorkspaceError};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Dependency sections that may reference other workspace packages
pub const DEPENDENCY_FIELDS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Raw JSON access to manifests on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestStore;

impl ManifestStore {
    /// Read and parse a manifest, ignoring a leading byte-order mark
    pub fn read(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|source| WorkspaceError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        serde_json::from_str(content).map_err(|source| {
            WorkspaceError::ManifestParse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Pretty-print a manifest with two-space indentation and a trailing newline
    pub fn write(path: &Path, value: &Value) -> Result<()> {
        let mut content = serde_json::to_string_pretty(value)?;
        content.push('\n');
        std::fs::write(path, content).map_err(|source| {
            WorkspaceError::ManifestWrite {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }
}

/// A parsed package.json with typed accessors
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
    value: Value,
}

impl PackageManifest {
    /// Load a manifest from disk
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let value = ManifestStore::read(&path)?;
        Ok(Self { path, value })
    }

    /// Wrap an already-parsed manifest
    pub fn from_value(path: impl Into<PathBuf>, value: Value) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    /// Path of the package.json file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Underlying JSON
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// `name`, if present and non-empty
    pub fn name(&self) -> Option<&str> {
        self.string_field("name")
    }

    /// `version`, if present and non-empty
    pub fn version(&self) -> Option<&str> {
        self.string_field("version")
    }

    /// `name`, or an error naming the manifest
    pub fn require_name(&self) -> Result<&str> {
        self.name().ok_or_else(|| self.missing("name"))
    }

    /// `version`, or an error naming the manifest
    pub fn require_version(&self) -> Result<&str> {
        self.version().ok_or_else(|| self.missing("version"))
    }

    /// Marked `"private": true`
    pub fn is_private(&self) -> bool {
        self.value
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Declares a `workspaces` field (of any shape)
    pub fn declares_workspaces(&self) -> bool {
        self.value
            .get("workspaces")
            .is_some_and(|w| !w.is_null())
    }

    /// One dependency section, when it is a JSON object
    pub fn dependency_section(&self, field: &str) -> Option<&Map<String, Value>> {
        self.value.get(field).and_then(Value::as_object)
    }

    /// Set the `version` field
    pub fn set_version(&mut self, version: &str) {
        if let Some(object) = self.value.as_object_mut() {
            object.insert("version".to_string(), Value::String(version.to_string()));
        }
    }

    /// Rewrite the range of `dependency` in every section that already declares it.
    ///
    /// Returns whether anything changed.
    pub fn rewrite_dependency(&mut self, dependency: &str, version: &str) -> bool {
        let mut changed = false;
        for field in DEPENDENCY_FIELDS {
            let Some(section) = self.value.get_mut(field).and_then(Value::as_object_mut) else {
                continue;
            };
            let Some(entry) = section.get_mut(dependency) else {
                continue;
            };
            let current = entry.as_str().unwrap_or_default();
            if let Some(updated) = rewrite_range(current, version) {
                if entry.as_str() != Some(updated.as_str()) {
                    *entry = Value::String(updated);
                    changed = true;
                }
            }
        }
        changed
    }

    /// Some section declares `dependency` with a range already pointing at `version`
    pub fn declares_at(&self, dependency: &str, version: &str) -> bool {
        DEPENDENCY_FIELDS.iter().any(|field| {
            self.dependency_section(field)
                .and_then(|section| section.get(dependency))
                .and_then(Value::as_str)
                .is_some_and(|current| rewrite_range(current, version).as_deref() == Some(current))
        })
    }

    /// Persist to the path it was loaded from
    pub fn save(&self) -> Result<()> {
        ManifestStore::write(&self.path, &self.value)
    }

    fn string_field(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn missing(&self, field: &str) -> crate::error::ReleaseError {
        WorkspaceError::MissingField {
            path: self.path.clone(),
            field: field.to_string(),
        }
        .into()
    }
}

/// New range for a dependency currently declared as `current`, or `None` when
/// the protocol pins something other than a registry version.
pub fn rewrite_range(current: &str, version: &str) -> Option<String> {
    let current = current.trim();
    if current.contains("git+") || current.starts_with("github:") {
        return None;
    }
    if current.starts_with("workspace:") {
        return Some(format!("workspace:^{version}"));
    }
    if ["file:", "link:", "http:", "https:"]
        .iter()
        .any(|p| current.starts_with(p))
    {
        return None;
    }
    if let Some(alias) = current.strip_prefix("npm:") {
        return Some(match alias.rfind('@') {
            Some(at) if at > 0 => format!("npm:{}@^{version}", &alias[..at]),
            _ => format!("^{version}"),
        });
    }
    Some(format!("^{version}"))
}
