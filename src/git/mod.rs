//! Git integration for release workflows.
//!
//! Git is driven through the system `git` executable via
//! [`crate::process::CommandRunner`]; commit history is parsed into
//! conventional commits for bump classification and changelogs.

mod commits;
mod operations;

pub use commits::{ConventionalCommit, RawCommit, find_pull_request_number, is_skip_ci};
pub use operations::Git;

/// Tag naming convention shared with the registry and release host
pub fn release_tag(package: &str, version: &semver::Version) -> String {
    format!("{package}@{version}")
}

/// Path of `dir` relative to `root` in forward-slash form, `.` for the root itself
pub fn relative_path(root: &std::path::Path, dir: &std::path::Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
