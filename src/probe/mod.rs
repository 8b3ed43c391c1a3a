//! Host probes - read-only queries of external resource state
//!
//! One probe implementation per resource kind, unified behind
//! [`HostProbe`] so every step shares the same check semantics instead
//! of scattering ad hoc existence tests. Probes never mutate the host;
//! if the query tool itself is missing, the result is a probe error,
//! never `Absent`.

use convergence::{Probe, ProbeState, Resource, ResourceKind, StepError};

pub mod account;
pub mod database;
pub mod filesystem;
pub mod package;
pub mod service;
pub mod workingcopy;

/// Probe backed by the host's own query tools
pub struct HostProbe;

impl Probe for HostProbe {
    fn check(&self, resource: &Resource) -> Result<ProbeState, StepError> {
        let state = match &resource.kind {
            ResourceKind::Package => package::installed(resource)?,
            ResourceKind::File { digest } => filesystem::file_state(resource, digest.as_deref()),
            ResourceKind::Directory => filesystem::directory_state(resource),
            ResourceKind::User => account::exists(resource)?,
            ResourceKind::DatabaseRole => database::role_exists(resource)?,
            ResourceKind::Service => service::enabled(resource)?,
            ResourceKind::VcsClone => workingcopy::cloned(resource)?,
        };

        log::debug!("probe {resource}: {state}");
        Ok(state)
    }
}
