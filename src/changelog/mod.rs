//! Changelog generation.
//!
//! The [`ChangelogGenerator`] port produces markdown for a package. The
//! default implementation, [`GitChangelogGenerator`], reads conventional
//! commits with `git log <range> -- <scope>`; the scope is always passed
//! explicitly so generation never depends on the process working directory.

mod git_generator;
mod sections;

pub use git_generator::GitChangelogGenerator;
pub use sections::{ReleaseSection, render_document};

use crate::error::Result;
use semver::Version;

/// Top-level heading of every changelog document
pub const CHANGELOG_HEADER: &str = "# Changelog";

/// Commit range of one changelog section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogRequest {
    /// Package the section belongs to
    pub package: String,
    /// Version the section is titled with
    pub version: Version,
    /// Exclusive start ref; `None` starts at the beginning of history
    pub from: Option<String>,
    /// Inclusive end ref
    pub to: String,
    /// Repository-relative directory the commits must touch
    pub path: String,
}

impl ChangelogRequest {
    /// `git log` range expression
    pub fn range(&self) -> String {
        match &self.from {
            Some(from) => format!("{from}..{}", self.to),
            None => self.to.clone(),
        }
    }
}

/// Produces changelog markdown for a package
pub trait ChangelogGenerator: Send + Sync {
    /// One release section covering `request`'s range
    fn generate(&self, request: &ChangelogRequest) -> impl Future<Output = Result<String>> + Send;

    /// The complete document: every released version plus the pending `next` release
    fn generate_document(
        &self,
        package: &str,
        next: &Version,
        path: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Document holds nothing but the top-level heading
pub fn is_bare_header(document: &str) -> bool {
    let trimmed = document.trim();
    trimmed.is_empty() || trimmed == CHANGELOG_HEADER
}
