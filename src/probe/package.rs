//! OS package probe

use convergence::{ProbeState, Resource, StepError};

use crate::exec::probe_capture;

/// Check whether a package is installed via the package database.
///
/// `dpkg-query` exits nonzero for unknown packages, which is a valid
/// negative answer; only a spawn failure is an error.
pub fn installed(resource: &Resource) -> Result<ProbeState, StepError> {
    let out = probe_capture(
        &resource.to_string(),
        "dpkg-query",
        &["-W", "-f=${Status}", &resource.id],
    )?;

    if out.success && out.stdout.contains("install ok installed") {
        Ok(ProbeState::Present)
    } else {
        Ok(ProbeState::Absent)
    }
}
