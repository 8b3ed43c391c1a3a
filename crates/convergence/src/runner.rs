//! Runner - sequential, fail-fast convergence of an ordered step list
//!
//! For each step: probe the resource, skip when the precondition
//! already holds, otherwise act and re-probe. The re-check defends
//! against actions that report success but silently no-op. There is no
//! retry and no rollback; provisioning is monotonic, and a halted run
//! reports the completed-step ledger so a re-run converges past them
//! via their preconditions.

use chrono::Utc;

use crate::error::StepError;
use crate::resource::Probe;
use crate::step::{ActionContext, Step};
use crate::types::{ExecutionRecord, FailedStep, RunOptions, RunResult, RunStatus, StepStatus};

/// Receives per-step progress during a run.
///
/// Keeps the engine free of any terminal UI dependency; binaries plug
/// in their own reporting.
pub trait RunObserver {
    fn on_step_start(&self, index: usize, total: usize, step: &Step);
    fn on_record(&self, record: &ExecutionRecord);
}

/// No-op observer
pub struct NoObserver;

impl RunObserver for NoObserver {
    fn on_step_start(&self, _index: usize, _total: usize, _step: &Step) {}
    fn on_record(&self, _record: &ExecutionRecord) {}
}

static NO_OBSERVER: NoObserver = NoObserver;

/// Executes an ordered step list against a probe
pub struct Runner<'a> {
    probe: &'a dyn Probe,
    observer: &'a dyn RunObserver,
    options: RunOptions,
}

impl<'a> Runner<'a> {
    pub fn new(probe: &'a dyn Probe, options: RunOptions) -> Self {
        Self {
            probe,
            observer: &NO_OBSERVER,
            options,
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn RunObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run the steps in order. Halts at the first failure.
    pub fn run(&self, steps: &[Step]) -> RunResult {
        let total = steps.len();
        let mut records: Vec<ExecutionRecord> = Vec::with_capacity(total);

        for (index, step) in steps.iter().enumerate() {
            self.observer.on_step_start(index, total, step);
            let started_at = Utc::now();

            let outcome = self.converge(step);
            let record = match outcome {
                Ok(StepOutcome::AlreadySatisfied) => ExecutionRecord {
                    step: step.name.clone(),
                    resource: step.resource.to_string(),
                    status: StepStatus::Skipped,
                    started_at,
                    output: None,
                    error: None,
                },
                Ok(StepOutcome::Converged { output }) => ExecutionRecord {
                    step: step.name.clone(),
                    resource: step.resource.to_string(),
                    status: StepStatus::Succeeded,
                    started_at,
                    output,
                    error: None,
                },
                Err(error) => {
                    let record = ExecutionRecord {
                        step: step.name.clone(),
                        resource: step.resource.to_string(),
                        status: StepStatus::Failed,
                        started_at,
                        output: None,
                        error: Some(error.to_string()),
                    };
                    self.observer.on_record(&record);
                    records.push(record);

                    return RunResult {
                        status: RunStatus::Failed,
                        failure: Some(FailedStep {
                            step: step.name.clone(),
                            resource: step.resource.to_string(),
                            message: error.to_string(),
                            error: Some(error),
                        }),
                        records,
                    };
                }
            };

            self.observer.on_record(&record);
            records.push(record);
        }

        RunResult {
            status: RunStatus::Completed,
            records,
            failure: None,
        }
    }

    fn converge(&self, step: &Step) -> Result<StepOutcome, StepError> {
        let before = self.probe.check(&step.resource)?;
        if step.resource.satisfied_by(before) {
            return Ok(StepOutcome::AlreadySatisfied);
        }

        let ctx = ActionContext {
            timeout: self.options.timeout,
            verbose: self.options.verbose,
        };
        let output = step.action.execute(&ctx)?;

        // The action reported success; hold it to that.
        let after = self.probe.check(&step.resource)?;
        if !step.resource.satisfied_by(after) {
            return Err(StepError::Postcondition {
                resource: step.resource.to_string(),
                observed: after.to_string(),
            });
        }

        Ok(StepOutcome::Converged { output })
    }
}

enum StepOutcome {
    AlreadySatisfied,
    Converged { output: Option<String> },
}
