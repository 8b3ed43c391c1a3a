//! Resources - the externally-owned things a step converges
//!
//! The engine never caches host state: every decision re-queries the
//! resource through a [`Probe`], so assumed and actual state cannot
//! drift apart between runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// The kind of external resource a probe knows how to query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
    /// An installed OS package
    Package,
    /// A file, optionally pinned to an expected content digest
    File { digest: Option<String> },
    /// A directory
    Directory,
    /// An OS user account
    User,
    /// A database role
    DatabaseRole,
    /// An enabled service unit
    Service,
    /// A version-control working copy
    VcsClone,
}

impl ResourceKind {
    /// Stable tag used in resource ids and log output
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::File { .. } => "file",
            Self::Directory => "directory",
            Self::User => "user",
            Self::DatabaseRole => "database-role",
            Self::Service => "service",
            Self::VcsClone => "vcs-clone",
        }
    }
}

/// Observed state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeState {
    /// Resource exists in the expected shape
    Present,
    /// Resource does not exist
    Absent,
    /// Resource exists but differs from the declared content
    Modified,
}

impl ProbeState {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Modified => "modified",
        };
        f.write_str(s)
    }
}

/// Identifies something on the host whose state gates a step.
/// Immutable once declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    /// Name or path, depending on kind
    pub id: String,
    /// The state the step's action is expected to establish
    pub expect: ProbeState,
}

impl Resource {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            expect: ProbeState::Present,
        }
    }

    /// Whether an observed state satisfies this resource's expectation
    pub fn satisfied_by(&self, observed: ProbeState) -> bool {
        observed == self.expect
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.tag(), self.id)
    }
}

/// Read-only check of a resource's current state.
///
/// Implementations wrap an external query and must never mutate the
/// host. Failure of the query tool itself is a [`StepError::Probe`],
/// not `Absent`.
pub trait Probe {
    fn check(&self, resource: &Resource) -> Result<ProbeState, StepError>;
}
