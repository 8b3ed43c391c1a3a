//! Error types for the convergence engine

use thiserror::Error;

/// Errors detected while ordering a step catalog, before anything runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Two steps declared with the same name
    #[error("duplicate step name '{0}'")]
    DuplicateName(String),

    /// A step requires a step that was never declared
    #[error("step '{step}' requires unknown step '{requires}'")]
    UnknownDependency { step: String, requires: String },

    /// The prerequisite graph contains a cycle
    #[error("dependency cycle involving step '{0}'")]
    Cycle(String),
}

/// Errors raised while probing or converging a single step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The read-only query itself failed (tool missing, unreadable output).
    /// Distinct from a negative-but-valid check, which is `ProbeState::Absent`.
    #[error("probe for {resource} failed: {message}")]
    Probe { resource: String, message: String },

    /// The external action returned failure
    #[error("action failed: {message}")]
    Action { message: String },

    /// The action did not finish within the configured timeout
    #[error("action did not finish within {seconds}s")]
    TimedOut { seconds: u64 },

    /// The action reported success but the resource is still unsatisfied
    #[error("{resource} is still {observed} after the action completed")]
    Postcondition { resource: String, observed: String },
}

impl StepError {
    /// Build an action error from captured stderr, kept verbatim
    pub fn action(message: impl Into<String>) -> Self {
        Self::Action {
            message: message.into(),
        }
    }

    /// Build a probe error for a resource
    pub fn probe(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Probe {
            resource: resource.into(),
            message: message.into(),
        }
    }
}
