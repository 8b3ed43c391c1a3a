//! Service unit probe

use convergence::{ProbeState, Resource, StepError};

use crate::exec::probe_capture;

/// `systemctl is-enabled` prints the enablement state and exits
/// nonzero for disabled or unknown units; both are valid negatives.
pub fn enabled(resource: &Resource) -> Result<ProbeState, StepError> {
    let out = probe_capture(
        &resource.to_string(),
        "systemctl",
        &["is-enabled", &resource.id],
    )?;

    if out.success && out.stdout_trimmed() == "enabled" {
        Ok(ProbeState::Present)
    } else {
        Ok(ProbeState::Absent)
    }
}
