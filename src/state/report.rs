//! Serializable summary of one release run.

use super::{ExecutionLedger, OriginalRepositoryState, ReleasePhase};
use crate::plan::{BumpOrigin, ReleasePlan};
use serde::Serialize;

/// How the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Still running
    InProgress,
    /// No package had changes
    NothingToRelease,
    /// Every unit was published and released
    Released,
    /// A phase failed
    Failed {
        /// Last phase that completed before the failure
        last_completed_phase: ReleasePhase,
        /// Error message
        error: String,
        /// Compensation ran
        rolled_back: bool,
    },
}

/// One planned release in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRelease {
    /// Package name
    pub name: String,
    /// Version before the release
    pub current: String,
    /// Version being released
    pub next: String,
    /// Direct or triggered
    pub origin: BumpOrigin,
    /// Number of dependency rewrites
    pub dependency_rewrites: usize,
}

/// Rollback summary in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackSummary {
    /// Compensations that succeeded
    pub rolled_back_operations: Vec<String>,
    /// Compensations that failed but were skipped
    pub warnings: Vec<String>,
    /// Fatal rollback error, if any
    pub error: Option<String>,
}

/// Persisted report of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// When the run ended
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Pre-mutation repository position
    pub original: Option<OriginalRepositoryState>,
    /// Planned releases
    pub plan: Vec<PlannedRelease>,
    /// Durable actions taken
    pub ledger: ExecutionLedger,
    /// Final outcome
    pub outcome: RunOutcome,
    /// Rollback details, when compensation ran
    pub rollback: Option<RollbackSummary>,
}

impl RunReport {
    /// Report for a run starting now
    pub fn start() -> Self {
        Self {
            started_at: chrono::Utc::now(),
            finished_at: None,
            original: None,
            plan: Vec::new(),
            ledger: ExecutionLedger::default(),
            outcome: RunOutcome::InProgress,
            rollback: None,
        }
    }

    /// Record the plan
    pub fn set_plan(&mut self, plan: &ReleasePlan) {
        self.plan = plan
            .units()
            .iter()
            .map(|unit| PlannedRelease {
                name: unit.name().to_string(),
                current: unit.transition().current().to_string(),
                next: unit.transition().next().to_string(),
                origin: unit.origin(),
                dependency_rewrites: unit.rewrites().len(),
            })
            .collect();
    }

    /// Close the report
    pub fn finish(&mut self, ledger: &ExecutionLedger, outcome: RunOutcome) {
        self.ledger = ledger.clone();
        self.outcome = outcome;
        self.finished_at = Some(chrono::Utc::now());
    }
}
