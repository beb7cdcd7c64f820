//! Grouping commits into markdown release sections.

use super::CHANGELOG_HEADER;
use crate::git::ConventionalCommit;
use semver::Version;

/// Commit groups in display order; the first matching group wins
const GROUPS: [(&str, fn(&ConventionalCommit) -> bool); 6] = [
    ("Features", |c| c.is("feat")),
    ("Bug Fixes", |c| c.is("fix")),
    ("Performance Improvements", |c| c.is("perf")),
    ("Reverts", |c| c.is("revert")),
    ("Dependencies", |c| c.is("chore") && c.scope.as_deref() == Some("deps")),
    ("Other Changes", |_| true),
];

/// Commits released under one version
#[derive(Debug, Clone)]
pub struct ReleaseSection {
    /// Version heading
    pub version: Version,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Commits, newest first
    pub commits: Vec<ConventionalCommit>,
}

impl ReleaseSection {
    /// Section for `version`, dropping commits marked `[skip ci]`
    pub fn new(version: Version, date: impl Into<String>, commits: Vec<ConventionalCommit>) -> Self {
        Self {
            version,
            date: date.into(),
            commits: commits.into_iter().filter(|c| !c.is_skip_ci()).collect(),
        }
    }

    /// No commits left after filtering
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Markdown for this section
    pub fn render(&self) -> String {
        let mut out = format!("## {} ({})\n", self.version, self.date);

        let breaking: Vec<String> = self
            .commits
            .iter()
            .filter(|c| c.is_breaking())
            .flat_map(|c| {
                let notes = if c.breaking_notes.is_empty() {
                    vec![c.subject.clone()]
                } else {
                    c.breaking_notes.clone()
                };
                notes.into_iter().map(move |note| bullet(c.scope.as_deref(), &note, None))
            })
            .collect();
        push_group(&mut out, "⚠ BREAKING CHANGES", &breaking);

        let mut grouped: Vec<Vec<String>> = vec![Vec::new(); GROUPS.len()];
        for commit in &self.commits {
            let Some(index) = GROUPS.iter().position(|(_, matches)| matches(commit)) else {
                continue;
            };
            let scope = if GROUPS[index].0 == "Dependencies" {
                None
            } else {
                commit.scope.as_deref()
            };
            grouped[index].push(bullet(scope, &commit.subject, Some(&commit.short_hash)));
        }
        for ((title, _), entries) in GROUPS.iter().zip(&grouped) {
            push_group(&mut out, title, entries);
        }
        out
    }
}

fn bullet(scope: Option<&str>, text: &str, hash: Option<&str>) -> String {
    let mut line = String::from("* ");
    if let Some(scope) = scope {
        line.push_str(&format!("**{scope}:** "));
    }
    line.push_str(text);
    if let Some(hash) = hash {
        line.push_str(&format!(" ({hash})"));
    }
    line
}

fn push_group(out: &mut String, title: &str, entries: &[String]) {
    if entries.is_empty() {
        return;
    }
    out.push_str(&format!("\n### {title}\n\n"));
    for entry in entries {
        out.push_str(entry);
        out.push('\n');
    }
}

/// Full document with sections in the given order (newest first).
///
/// Sections without commits are left out, so a document with no entries
/// renders as the bare header.
pub fn render_document(sections: &[ReleaseSection]) -> String {
    let mut out = format!("{CHANGELOG_HEADER}\n");
    for section in sections.iter().filter(|s| !s.is_empty()) {
        out.push('\n');
        out.push_str(&section.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::RawCommit;

    fn commit(short: &str, subject: &str, body: &str) -> ConventionalCommit {
        ConventionalCommit::parse(&RawCommit {
            hash: format!("{short}000000000"),
            short_hash: short.into(),
            date: "2024-03-01".into(),
            subject: subject.into(),
            body: body.into(),
        })
    }

    #[test]
    fn test_section_groups_commits() {
        let section = ReleaseSection::new(
            Version::new(1, 1, 0),
            "2024-03-01",
            vec![
                commit("aaaaaaa", "feat(api): add endpoint", ""),
                commit("bbbbbbb", "fix: handle null", ""),
                commit("ccccccc", "chore(deps): bump b to v2.0.0 in packages/a", ""),
                commit("ddddddd", "chore: release [skip ci]", ""),
                commit("eeeeeee", "update readme", ""),
            ],
        );
        let text = section.render();
        assert!(text.starts_with("## 1.1.0 (2024-03-01)\n"));
        assert!(text.contains("### Features\n\n* **api:** add endpoint (aaaaaaa)\n"));
        assert!(text.contains("### Bug Fixes\n\n* handle null (bbbbbbb)\n"));
        assert!(text.contains("### Dependencies\n\n* bump b to v2.0.0 in packages/a (ccccccc)\n"));
        assert!(text.contains("### Other Changes\n\n* update readme (eeeeeee)\n"));
        assert!(!text.contains("release"));
    }

    #[test]
    fn test_breaking_notes_listed_first() {
        let section = ReleaseSection::new(
            Version::new(2, 0, 0),
            "2024-03-01",
            vec![
                commit("aaaaaaa", "feat(core)!: drop node 16", ""),
                commit("bbbbbbb", "fix: x", "BREAKING CHANGE: config moved"),
            ],
        );
        let text = section.render();
        let breaking = text.find("### ⚠ BREAKING CHANGES").expect("breaking section");
        let features = text.find("### Features").expect("features section");
        assert!(breaking < features);
        assert!(text.contains("* **core:** drop node 16\n"));
        assert!(text.contains("* config moved\n"));
    }

    #[test]
    fn test_document_keeps_section_order() {
        let doc = render_document(&[
            ReleaseSection::new(Version::new(1, 1, 0), "2024-03-02", vec![commit("a", "fix: b", "")]),
            ReleaseSection::new(Version::new(1, 0, 0), "2024-03-01", vec![commit("c", "feat: d", "")]),
        ]);
        assert!(doc.starts_with("# Changelog\n\n## 1.1.0"));
        assert!(doc.find("## 1.1.0").expect("newer") < doc.find("## 1.0.0").expect("older"));
    }

    #[test]
    fn test_document_without_entries_is_bare() {
        let doc = render_document(&[
            ReleaseSection::new(Version::new(1, 1, 0), "2024-03-02", Vec::new()),
            ReleaseSection::new(
                Version::new(1, 0, 0),
                "2024-03-01",
                vec![commit("a", "chore: release [skip ci]", "")],
            ),
        ]);
        assert!(crate::changelog::is_bare_header(&doc));
    }
}
