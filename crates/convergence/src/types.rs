//! Execution records and run-level types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::StepError;

/// Outcome of a single step within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Precondition already held; action never invoked
    Skipped,
    /// Action ran and the postcondition re-check passed
    Succeeded,
    /// Probe, action, or postcondition failed
    Failed,
}

/// Per-step record, append-only within a run and discarded between runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub step: String,
    pub resource: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    /// Captured output from the external action, when any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The external error text, verbatim, when the step failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Terminal state of a provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Failed,
}

/// The failing step of a halted run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedStep {
    pub step: String,
    pub resource: String,
    #[serde(skip)]
    pub error: Option<StepError>,
    pub message: String,
}

/// Result of executing an ordered step list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub records: Vec<ExecutionRecord>,
    /// Present when the run halted fail-fast
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailedStep>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Ordered names of steps that finished (skipped or succeeded),
    /// the ledger a re-run can converge past via preconditions
    pub fn completed(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.status != StepStatus::Failed)
            .map(|r| r.step.as_str())
            .collect()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }
}

/// Options for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Per-action timeout; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Surface external command output per step
    pub verbose: bool,
}
