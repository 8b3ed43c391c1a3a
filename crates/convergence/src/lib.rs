//! # Convergence
//!
//! An idempotent provisioning engine: declare steps with resource
//! preconditions, order them by prerequisite, and converge a host by
//! acting only where a probe reports the resource unsatisfied.
//!
//! ## Core Concepts
//!
//! - **Resource**: something externally owned whose state gates a step
//!   (a package, file, user, database role, service, working copy)
//! - **Probe**: read-only query of a resource's current state
//! - **Step**: a named unit of work with prerequisites, a resource
//!   precondition, and an opaque action
//! - **Planner**: total order over a step catalog, cycle-checked
//!   before anything runs
//! - **Runner**: sequential fail-fast execution with a postcondition
//!   re-check after every action
//!
//! ## Example
//!
//! ```ignore
//! use convergence::{
//!     plan, Action, ActionContext, Probe, ProbeState, Resource,
//!     ResourceKind, Runner, RunOptions, Step, StepError,
//! };
//!
//! #[derive(Debug)]
//! struct Touch { path: String }
//!
//! impl Action for Touch {
//!     fn describe(&self) -> String { format!("touch {}", self.path) }
//!     fn execute(&self, _ctx: &ActionContext) -> Result<Option<String>, StepError> {
//!         std::fs::write(&self.path, "").map_err(|e| StepError::action(e.to_string()))?;
//!         Ok(None)
//!     }
//! }
//!
//! struct FsProbe;
//!
//! impl Probe for FsProbe {
//!     fn check(&self, resource: &Resource) -> Result<ProbeState, StepError> {
//!         if std::path::Path::new(&resource.id).exists() {
//!             Ok(ProbeState::Present)
//!         } else {
//!             Ok(ProbeState::Absent)
//!         }
//!     }
//! }
//!
//! let steps = plan(vec![Step::new(
//!     "touch-marker",
//!     Resource::new(ResourceKind::File { digest: None }, "/tmp/marker"),
//!     Box::new(Touch { path: "/tmp/marker".into() }),
//! )])?;
//!
//! let result = Runner::new(&FsProbe, RunOptions::default()).run(&steps);
//! assert!(result.is_success());
//! ```
//!
//! The engine holds no authoritative copy of host state: every run
//! re-probes, so steps completed by an earlier (possibly halted) run
//! are skipped through their preconditions rather than replayed from
//! a persisted ledger.

pub mod error;
pub mod planner;
pub mod resource;
pub mod runner;
pub mod step;
pub mod types;

// Re-export main types at crate root
pub use error::{PlanError, StepError};
pub use planner::plan;
pub use resource::{Probe, ProbeState, Resource, ResourceKind};
pub use runner::{NoObserver, RunObserver, Runner};
pub use step::{Action, ActionContext, Step};
pub use types::{
    ExecutionRecord, FailedStep, RunOptions, RunResult, RunStatus, StepStatus,
};
