//! Commit log records and conventional-commit parsing.

use regex::Regex;
use std::sync::LazyLock;

/// Field separator used in the `git log` format string
pub(crate) const FIELD_SEP: char = '\u{1f}';
/// Record separator used in the `git log` format string
pub(crate) const RECORD_SEP: char = '\u{1e}';
/// `git log --format` producing one [`RawCommit`] per record
pub(crate) const LOG_FORMAT: &str = "%H%x1f%h%x1f%cs%x1f%s%x1f%b%x1e";

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)(?:\(([^)]*)\))?(!)?: (.+)$").expect("commit header regex is valid")
});

static SKIP_CI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(skip ci|ci skip)\]").expect("skip-ci regex is valid")
});

static PULL_REQUEST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*#(\d+)(?:\s+#\d+)*\s*\)").expect("pull request regex is valid")
});

/// One commit as read from `git log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    /// Full SHA
    pub hash: String,
    /// Abbreviated SHA
    pub short_hash: String,
    /// Committer date (YYYY-MM-DD)
    pub date: String,
    /// First line of the message
    pub subject: String,
    /// Remaining message body
    pub body: String,
}

impl RawCommit {
    /// Parse the output of `git log --format=LOG_FORMAT`
    pub(crate) fn parse_log(output: &str) -> Vec<RawCommit> {
        output
            .split(RECORD_SEP)
            .map(|record| record.trim_start_matches(['\n', '\r']))
            .filter(|record| !record.trim().is_empty())
            .filter_map(|record| {
                let mut fields = record.splitn(5, FIELD_SEP);
                Some(RawCommit {
                    hash: fields.next()?.trim().to_string(),
                    short_hash: fields.next()?.trim().to_string(),
                    date: fields.next()?.trim().to_string(),
                    subject: fields.next()?.trim().to_string(),
                    body: fields.next().unwrap_or_default().trim().to_string(),
                })
            })
            .collect()
    }
}

/// A commit interpreted under the conventional-commit grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
    /// Full SHA
    pub hash: String,
    /// Abbreviated SHA
    pub short_hash: String,
    /// Original header line
    pub header: String,
    /// Commit type (`feat`, `fix`, ...); `None` for non-conventional headers
    pub kind: Option<String>,
    /// Optional scope
    pub scope: Option<String>,
    /// Description after the `type(scope): ` prefix
    pub subject: String,
    /// Header carries the `!` marker
    pub bang: bool,
    /// `BREAKING CHANGE:` notes from the body
    pub breaking_notes: Vec<String>,
}

impl ConventionalCommit {
    /// Interpret a raw commit
    pub fn parse(raw: &RawCommit) -> Self {
        let (kind, scope, bang, subject) = match HEADER.captures(&raw.subject) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str().to_string()),
                caps.get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty()),
                caps.get(3).is_some(),
                caps.get(4)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            ),
            None => (None, None, false, raw.subject.clone()),
        };

        Self {
            hash: raw.hash.clone(),
            short_hash: raw.short_hash.clone(),
            header: raw.subject.clone(),
            kind,
            scope,
            subject,
            bang,
            breaking_notes: breaking_notes(&raw.body),
        }
    }

    /// Header or notes announce a breaking change
    pub fn is_breaking(&self) -> bool {
        self.bang || !self.breaking_notes.is_empty()
    }

    /// Commit type equals `kind`
    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    /// Header is marked to be left out of release notes
    pub fn is_skip_ci(&self) -> bool {
        is_skip_ci(&self.header)
    }
}

fn breaking_notes(body: &str) -> Vec<String> {
    let mut notes = Vec::new();
    let mut current: Option<String> = None;

    for line in body.lines() {
        let marker = ["BREAKING CHANGE:", "BREAKING-CHANGE:"]
            .iter()
            .find_map(|m| line.trim_start().strip_prefix(m));
        if let Some(rest) = marker {
            if let Some(note) = current.take() {
                notes.push(note);
            }
            current = Some(rest.trim().to_string());
        } else if line.trim().is_empty() {
            notes.extend(current.take());
        } else if let Some(note) = current.as_mut() {
            if !note.is_empty() {
                note.push(' ');
            }
            note.push_str(line.trim());
        }
    }
    if let Some(note) = current {
        notes.push(note);
    }
    notes
}

/// Header carries `[skip ci]` or `[ci skip]` (case-insensitive)
pub fn is_skip_ci(header: &str) -> bool {
    SKIP_CI.is_match(header)
}

/// First `(#N)` pull-request reference in a commit message
pub fn find_pull_request_number(message: &str) -> Option<u64> {
    PULL_REQUEST
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
