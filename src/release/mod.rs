//! Release orchestration.
//!
//! [`Releaser`] plans a release and hands the plan to the
//! [`TransactionalReleaseExecutor`]. When the executor fails past the point
//! where working-tree edits can simply be discarded, the
//! [`RollbackCoordinator`] compensates everything the ledger recorded and the
//! original error is returned.

mod executor;
mod pipeline;
mod rollback;

pub use executor::{RELEASE_COMMIT_MESSAGE, TransactionalReleaseExecutor};
pub use pipeline::Releaser;
pub use rollback::{RollbackCoordinator, RollbackResult, failure_comment};
