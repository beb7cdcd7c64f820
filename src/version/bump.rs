//! Bump classification and next-version arithmetic.

use crate::git::ConventionalCommit;
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;

/// Kind of version increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Incompatible API change
    Major,
    /// Backwards-compatible feature
    Minor,
    /// Backwards-compatible fix
    Patch,
    /// Next prerelease on the current or a new channel
    Prerelease,
    /// Promote a prerelease to its stable version
    Release,
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Prerelease => "prerelease",
            ReleaseType::Release => "release",
        })
    }
}

/// Output of a bump classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BumpRecommendation {
    /// 0 = major, 1 = minor, 2 = patch
    pub level: u8,
    /// Increment to apply
    pub release_type: ReleaseType,
    /// Human-readable justification, also scanned for channel keywords
    pub reason: String,
}

/// Decides how a set of commits should bump a version
pub trait WhatBump: Send + Sync {
    /// `None` means "no release"
    fn recommend(&self, commits: &[ConventionalCommit]) -> Option<BumpRecommendation>;
}

/// Breaking change ⇒ major, feature ⇒ minor, anything else ⇒ patch
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWhatBump;

impl WhatBump for DefaultWhatBump {
    fn recommend(&self, commits: &[ConventionalCommit]) -> Option<BumpRecommendation> {
        if commits.is_empty() {
            return None;
        }

        let mut breaks = 0;
        let mut features = 0;
        for commit in commits {
            breaks += commit.breaking_notes.len();
            if commit.bang {
                breaks += 1;
            }
            if commit.is("feat") {
                features += 1;
            }
        }

        Some(if breaks > 0 {
            BumpRecommendation {
                level: 0,
                release_type: ReleaseType::Major,
                reason: format!("There are {breaks} BREAKING CHANGES"),
            }
        } else if features > 0 {
            BumpRecommendation {
                level: 1,
                release_type: ReleaseType::Minor,
                reason: format!("There are {features} new features"),
            }
        } else {
            BumpRecommendation {
                level: 2,
                release_type: ReleaseType::Patch,
                reason: "There are only patch changes in this release".to_string(),
            }
        })
    }
}

/// Prerelease channel names, in keyword priority order
const CHANNELS: [&str; 3] = ["rc", "beta", "alpha"];

/// Channel selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReleaseChannel {
    /// Leave prerelease lines and publish stable versions
    Stable,
    /// Alpha prereleases
    Alpha,
    /// Beta prereleases
    Beta,
    /// Release candidates
    Rc,
}

impl ReleaseChannel {
    fn keyword(self) -> Option<&'static str> {
        match self {
            ReleaseChannel::Stable => None,
            ReleaseChannel::Alpha => Some("alpha"),
            ReleaseChannel::Beta => Some("beta"),
            ReleaseChannel::Rc => Some("rc"),
        }
    }

    /// Steer a recommendation onto this channel.
    ///
    /// `stable` promotes a prerelease; a named channel turns the bump into a
    /// prerelease whose reason names the channel.
    pub fn apply(self, recommendation: BumpRecommendation, current: &Version) -> BumpRecommendation {
        match self.keyword() {
            None if current.pre.is_empty() => recommendation,
            None => BumpRecommendation {
                release_type: ReleaseType::Release,
                reason: format!("{}; promoting to stable", recommendation.reason),
                ..recommendation
            },
            Some(channel) => BumpRecommendation {
                release_type: ReleaseType::Prerelease,
                reason: format!("{}; {channel} prerelease", recommendation.reason),
                ..recommendation
            },
        }
    }
}

/// Highest-priority channel named as a whole word in `reason`
pub fn channel_from_reason(reason: &str) -> Option<&'static str> {
    let lowered = reason.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    CHANNELS.into_iter().find(|channel| words.contains(channel))
}

/// Apply a release type to `current`.
///
/// While `current` is a prerelease, only `release` leaves the line and only a
/// channel switch resets the counter; every other type increments it. Returns
/// `None` when the result would not differ from `current`.
pub fn next_version(current: &Version, release_type: ReleaseType, reason: &str) -> Option<Version> {
    let next = if current.pre.is_empty() {
        match release_type {
            ReleaseType::Major => Version::new(current.major + 1, 0, 0),
            ReleaseType::Minor => Version::new(current.major, current.minor + 1, 0),
            ReleaseType::Patch => Version::new(current.major, current.minor, current.patch + 1),
            ReleaseType::Prerelease => {
                let pre = match channel_from_reason(reason) {
                    Some(channel) => format!("{channel}.0"),
                    None => "0".to_string(),
                };
                let mut next = Version::new(current.major, current.minor, current.patch + 1);
                next.pre = Prerelease::new(&pre).ok()?;
                next
            }
            ReleaseType::Release => return None,
        }
    } else {
        let current_channel = current
            .pre
            .as_str()
            .split('.')
            .next()
            .filter(|id| id.parse::<u64>().is_err())
            .map(str::to_string);
        match release_type {
            ReleaseType::Release => {
                let mut next = current.clone();
                next.pre = Prerelease::EMPTY;
                next.build = BuildMetadata::EMPTY;
                next
            }
            ReleaseType::Prerelease => match channel_from_reason(reason) {
                Some(target) if current_channel.as_deref() != Some(target) => {
                    let mut next = current.clone();
                    next.pre = Prerelease::new(&format!("{target}.0")).ok()?;
                    next.build = BuildMetadata::EMPTY;
                    next
                }
                _ => increment_prerelease(current)?,
            },
            _ => increment_prerelease(current)?,
        }
    };

    (next != *current).then_some(next)
}

fn increment_prerelease(current: &Version) -> Option<Version> {
    let mut identifiers: Vec<String> = current
        .pre
        .as_str()
        .split('.')
        .map(str::to_string)
        .collect();
    match identifiers
        .iter()
        .rposition(|id| id.parse::<u64>().is_ok())
    {
        Some(index) => {
            let value: u64 = identifiers[index].parse().ok()?;
            identifiers[index] = (value + 1).to_string();
        }
        None => identifiers.push("0".to_string()),
    }
    let mut next = current.clone();
    next.pre = Prerelease::new(&identifiers.join(".")).ok()?;
    next.build = BuildMetadata::EMPTY;
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::RawCommit;

    fn v(s: &str) -> Version {
        Version::parse(s).expect("valid version")
    }

    fn commit(subject: &str, body: &str) -> ConventionalCommit {
        ConventionalCommit::parse(&RawCommit {
            hash: "0".repeat(40),
            short_hash: "0000000".into(),
            date: "2024-01-01".into(),
            subject: subject.into(),
            body: body.into(),
        })
    }

    #[test]
    fn test_default_what_bump_empty_is_none() {
        assert_eq!(DefaultWhatBump.recommend(&[]), None);
    }

    #[test]
    fn test_default_what_bump_levels() {
        let rec = DefaultWhatBump
            .recommend(&[commit("feat: a", ""), commit("fix!: b", ""), commit("fix: c", "BREAKING CHANGE: d")])
            .expect("recommendation");
        assert_eq!(rec.release_type, ReleaseType::Major);
        assert_eq!(rec.level, 0);
        assert_eq!(rec.reason, "There are 2 BREAKING CHANGES");

        let rec = DefaultWhatBump
            .recommend(&[commit("feat: a", ""), commit("feat(x): b", "")])
            .expect("recommendation");
        assert_eq!(rec.release_type, ReleaseType::Minor);
        assert_eq!(rec.reason, "There are 2 new features");

        let rec = DefaultWhatBump
            .recommend(&[commit("chore: a", ""), commit("docs: b", "")])
            .expect("recommendation");
        assert_eq!(rec.release_type, ReleaseType::Patch);
        assert_eq!(rec.level, 2);
        assert_eq!(rec.reason, "There are only patch changes in this release");
    }

    #[test]
    fn test_standard_increments() {
        assert_eq!(next_version(&v("1.2.3"), ReleaseType::Major, ""), Some(v("2.0.0")));
        assert_eq!(next_version(&v("1.2.3"), ReleaseType::Minor, ""), Some(v("1.3.0")));
        assert_eq!(next_version(&v("1.2.3"), ReleaseType::Patch, ""), Some(v("1.2.4")));
    }

    #[test]
    fn test_prerelease_channel_switch_resets_counter() {
        assert_eq!(
            next_version(&v("2.0.0-beta.5"), ReleaseType::Prerelease, "moving to rc"),
            Some(v("2.0.0-rc.0"))
        );
    }

    #[test]
    fn test_prerelease_same_channel_increments() {
        assert_eq!(
            next_version(&v("2.0.0-beta.5"), ReleaseType::Prerelease, "another beta"),
            Some(v("2.0.0-beta.6"))
        );
        assert_eq!(
            next_version(&v("2.0.0-beta.5"), ReleaseType::Prerelease, "no channel named"),
            Some(v("2.0.0-beta.6"))
        );
    }

    #[test]
    fn test_channel_priority_prefers_rc() {
        assert_eq!(channel_from_reason("alpha or beta or RC"), Some("rc"));
        assert_eq!(channel_from_reason("beta and alpha"), Some("beta"));
        assert_eq!(channel_from_reason("sources changed"), None);
    }

    #[test]
    fn test_release_exits_prerelease() {
        assert_eq!(
            next_version(&v("2.0.0-rc.5"), ReleaseType::Release, ""),
            Some(v("2.0.0"))
        );
    }

    #[test]
    fn test_numeric_bumps_stay_on_prerelease_line() {
        assert_eq!(
            next_version(&v("2.0.0-alpha.1"), ReleaseType::Major, "There are 1 BREAKING CHANGES"),
            Some(v("2.0.0-alpha.2"))
        );
        assert_eq!(
            next_version(&v("1.0.0-alpha"), ReleaseType::Patch, ""),
            Some(v("1.0.0-alpha.0"))
        );
    }

    #[test]
    fn test_prerelease_from_stable() {
        assert_eq!(
            next_version(&v("1.2.3"), ReleaseType::Prerelease, "x; beta prerelease"),
            Some(v("1.2.4-beta.0"))
        );
        assert_eq!(
            next_version(&v("1.2.3"), ReleaseType::Prerelease, ""),
            Some(v("1.2.4-0"))
        );
    }

    #[test]
    fn test_no_op_is_none() {
        assert_eq!(next_version(&v("1.2.3"), ReleaseType::Release, ""), None);
        for current in ["0.0.1", "1.0.0", "3.4.5-rc.1"] {
            for release_type in [
                ReleaseType::Major,
                ReleaseType::Minor,
                ReleaseType::Patch,
                ReleaseType::Prerelease,
                ReleaseType::Release,
            ] {
                if let Some(next) = next_version(&v(current), release_type, "") {
                    assert_ne!(next, v(current));
                }
            }
        }
    }

    #[test]
    fn test_channel_apply() {
        let rec = BumpRecommendation {
            level: 1,
            release_type: ReleaseType::Minor,
            reason: "There are 1 new features".into(),
        };
        let promoted = ReleaseChannel::Stable.apply(rec.clone(), &v("1.0.0-rc.2"));
        assert_eq!(promoted.release_type, ReleaseType::Release);
        let untouched = ReleaseChannel::Stable.apply(rec.clone(), &v("1.0.0"));
        assert_eq!(untouched, rec);
        let beta = ReleaseChannel::Beta.apply(rec, &v("1.0.0-alpha.3"));
        assert_eq!(beta.release_type, ReleaseType::Prerelease);
        assert_eq!(
            next_version(&v("1.0.0-alpha.3"), beta.release_type, &beta.reason),
            Some(v("1.0.0-beta.0"))
        );
    }
}
