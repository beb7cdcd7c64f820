//! Release planning: dependency scanning and plan assembly.
//!
//! Planning reads history and manifests only, with one exception: packages
//! bumped solely because a dependency moved get their dependency rewrites
//! committed before their bump is computed, so the bump range contains them.

mod builder;
mod dependency_commits;
mod scanner;
mod types;

pub use builder::ReleasePlanBuilder;
pub use dependency_commits::DependencyCommitWriter;
pub use scanner::DependencyGraphScanner;
pub use types::{
    BumpOrigin, DependencyRewriteMap, DependencyRewriteSet, PackageIdentity, ReleasePlan, ReleaseUnit,
    VersionTransition,
};
