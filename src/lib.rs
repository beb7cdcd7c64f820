//! # Voidstone
//!
//! Release orchestration for npm workspaces.
//!
//! Every package whose directory saw conventional commits since its last
//! `name@version` tag gets a version bump. Internal dependents have their
//! dependency ranges rewritten, committed and bumped in turn. Changelogs are
//! regenerated, one release commit and one tag per package are pushed, and
//! each package is published and given a GitHub release.
//!
//! Every durable action is recorded in an [`ExecutionLedger`]. When a run
//! fails after the first of them, [`RollbackCoordinator`] deletes tags,
//! restores the branch, unpublishes, deletes releases and reopens the pull
//! request that triggered the run.
//!
//! ## Usage
//!
//! ```bash
//! voidstone                  # release from the current directory
//! voidstone --channel rc     # release candidates
//! voidstone plan             # preview without changing anything
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod changelog;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod plan;
pub mod process;
pub mod publish;
pub mod release;
pub mod state;
pub mod version;
pub mod workspace;

pub use changelog::{ChangelogGenerator, GitChangelogGenerator};
pub use cli::Args;
pub use config::{EnvConfig, Preflight, ReleaseSettings, RepositorySlug};
pub use error::{ReleaseError, Result};
pub use github::{GitHubReleaseManager, ReleaseHost};
pub use plan::{ReleasePlan, ReleaseUnit, VersionTransition};
pub use process::{CommandRunner, SystemRunner};
pub use release::{Releaser, RollbackCoordinator, TransactionalReleaseExecutor};
pub use state::{ExecutionLedger, ReleasePhase, RunOutcome, RunReport, StateManager};
pub use version::{BumpCalculator, ReleaseChannel};
pub use workspace::{PackageManifest, Workspace};
