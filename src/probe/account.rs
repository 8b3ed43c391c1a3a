//! OS user account probe

use convergence::{ProbeState, Resource, StepError};

use crate::exec::probe_capture;

/// `getent passwd <name>` exits 0 when the account exists and 2 when
/// it does not. Any other exit means the lookup itself is broken and
/// is a probe error, never a negative answer.
pub fn exists(resource: &Resource) -> Result<ProbeState, StepError> {
    let out = probe_capture(&resource.to_string(), "getent", &["passwd", &resource.id])?;

    if out.success {
        return Ok(ProbeState::Present);
    }

    match out.code {
        Some(2) => Ok(ProbeState::Absent),
        code => {
            let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(StepError::probe(
                resource.to_string(),
                format!("getent exited with status {code}: {}", out.stderr.trim()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergence::ResourceKind;

    #[test]
    fn existing_account_is_present() {
        let resource = Resource::new(ResourceKind::User, "root");
        assert_eq!(exists(&resource).unwrap(), ProbeState::Present);
    }

    #[test]
    fn unknown_account_is_absent_not_an_error() {
        let resource = Resource::new(ResourceKind::User, "no-such-account-zq7");
        assert_eq!(exists(&resource).unwrap(), ProbeState::Absent);
    }
}
