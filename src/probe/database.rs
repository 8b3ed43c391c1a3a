//! Database role probe

use convergence::{ProbeState, Resource, StepError};

use crate::exec::probe_capture;

/// Query the catalog for the role as the database superuser account.
///
/// A failed query (database down, psql missing) is a probe error, not
/// a negative answer: acting on it could re-create an existing role.
pub fn role_exists(resource: &Resource) -> Result<ProbeState, StepError> {
    // Role names come from validated params; quote anyway.
    let query = format!(
        "SELECT 1 FROM pg_roles WHERE rolname='{}'",
        resource.id.replace('\'', "''")
    );
    let out = probe_capture(
        &resource.to_string(),
        "runuser",
        &["-u", "postgres", "--", "psql", "-tAc", &query],
    )?;

    if !out.success {
        return Err(StepError::probe(
            resource.to_string(),
            out.stderr.trim().to_string(),
        ));
    }

    if out.stdout_trimmed() == "1" {
        Ok(ProbeState::Present)
    } else {
        Ok(ProbeState::Absent)
    }
}
