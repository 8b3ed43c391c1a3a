//! Version-control working copy probe

use std::path::Path;

use convergence::{ProbeState, Resource, StepError};

use crate::exec::probe_capture;

/// A clone is `Present` when the path is a git work tree. The path not
/// existing at all is an ordinary negative; a missing `git` binary is
/// a probe error.
pub fn cloned(resource: &Resource) -> Result<ProbeState, StepError> {
    if !Path::new(&resource.id).exists() {
        return Ok(ProbeState::Absent);
    }

    let out = probe_capture(
        &resource.to_string(),
        "git",
        &["-C", &resource.id, "rev-parse", "--is-inside-work-tree"],
    )?;

    if out.success && out.stdout_trimmed() == "true" {
        Ok(ProbeState::Present)
    } else {
        Ok(ProbeState::Absent)
    }
}
