//! Version management for workspace packages.
//!
//! [`bump`] holds the pure pieces: commit classification and next-version
//! arithmetic including the prerelease channel rules. [`BumpCalculator`]
//! feeds them with each package's history since its last release tag.

pub mod bump;
mod calculator;

pub use bump::{
    BumpRecommendation, DefaultWhatBump, ReleaseChannel, ReleaseType, WhatBump, channel_from_reason,
    next_version,
};
pub use calculator::BumpCalculator;
