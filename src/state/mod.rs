//! Release state: the execution ledger, the pre-mutation snapshot and the
//! optional persisted run report.

mod ledger;
mod manager;
mod report;

pub use ledger::{ExecutionLedger, OriginalRepositoryState, ReleasePhase};
pub use manager::{SaveStateResult, StateManager};
pub use report::{PlannedRelease, RollbackSummary, RunOutcome, RunReport};
