//! Step model - a named unit of provisioning work
//!
//! Steps are pure data until the runner executes them: a precondition
//! resource, prerequisite step names, and a boxed action against an
//! external system.

use std::fmt;
use std::time::Duration;

use crate::error::StepError;
use crate::resource::Resource;

/// Context passed to action execution
#[derive(Debug, Clone, Default)]
pub struct ActionContext {
    /// Per-action timeout; network-bound actions are the realistic
    /// stall points (downloads, clones, certificate issuance)
    pub timeout: Option<Duration>,
    /// Whether to surface external command output
    pub verbose: bool,
}

/// An opaque operation against an external system.
///
/// Actions are expected to be safe to re-run but the runner never
/// retries them automatically.
pub trait Action: Send + Sync + fmt::Debug {
    /// Human-readable description of what the action will do
    fn describe(&self) -> String;

    /// Execute the action, returning captured output on success
    fn execute(&self, ctx: &ActionContext) -> Result<Option<String>, StepError>;
}

/// A named unit of work with a precondition, prerequisites, and an action
#[derive(Debug)]
pub struct Step {
    /// Unique name within a catalog
    pub name: String,
    /// Names of steps that must complete before this one
    pub requires: Vec<String>,
    /// Skip the action entirely when this resource already holds
    pub resource: Resource,
    pub action: Box<dyn Action>,
}

impl Step {
    pub fn new(name: impl Into<String>, resource: Resource, action: Box<dyn Action>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            resource,
            action,
        }
    }

    /// Declare a prerequisite step by name
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(name.into());
        self
    }

    /// Declare several prerequisites at once
    pub fn requires_all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, ResourceKind};

    #[derive(Debug)]
    struct Noop;

    impl Action for Noop {
        fn describe(&self) -> String {
            "noop".to_string()
        }

        fn execute(&self, _ctx: &ActionContext) -> Result<Option<String>, StepError> {
            Ok(None)
        }
    }

    #[test]
    fn builder_collects_prerequisites() {
        let step = Step::new(
            "clone-source",
            Resource::new(ResourceKind::VcsClone, "/opt/app/src"),
            Box::new(Noop),
        )
        .requires("install-package-git")
        .requires_all(["create-install-dir"]);

        assert_eq!(
            step.requires,
            vec!["install-package-git", "create-install-dir"]
        );
    }
}
