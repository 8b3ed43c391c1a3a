//! Process helpers for external tool invocations

use convergence::StepError;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Captured output of an external command
#[derive(Debug, Clone)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl Captured {
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Run a command with an optional wall-clock timeout.
///
/// On timeout the child is killed and the result is
/// [`StepError::TimedOut`], so callers can tell a stalled network
/// operation apart from a failed one.
pub fn run_with_timeout(
    cmd: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<Captured, StepError> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StepError::action(format!("{cmd}: {e}")))?;

    // Drain pipes on threads so a chatty child can't fill a pipe and
    // stall past the deadline check.
    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let deadline = timeout.map(|t| (Instant::now() + t, t));

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if let Some((at, t)) = deadline
                    && Instant::now() >= at
                {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(StepError::TimedOut {
                        seconds: t.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(StepError::action(format!("{cmd}: {e}"))),
        }
    };

    let stdout = stdout_reader.map(join_drained).unwrap_or_default();
    let stderr = stderr_reader.map(join_drained).unwrap_or_default();

    Ok(Captured {
        stdout,
        stderr,
        success: status.success(),
        code: status.code(),
    })
}

fn drain<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = source.read_to_string(&mut buf);
        buf
    })
}

fn join_drained(handle: std::thread::JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

/// Probe-side capture: a spawn failure is a probe error naming the
/// resource, never a negative check
pub fn probe_capture(resource: &str, cmd: &str, args: &[&str]) -> Result<Captured, StepError> {
    let output = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StepError::probe(resource, format!("{cmd}: {e}")))?;

    Ok(Captured {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_exit_is_unsuccessful_not_an_error() {
        let out = run_with_timeout("false", &[], None).unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(1));
    }

    #[test]
    fn missing_tool_is_an_error_not_a_negative_result() {
        assert!(run_with_timeout("definitely-not-a-real-tool-xyz", &[], None).is_err());
    }

    #[test]
    fn timeout_kills_and_reports_timed_out() {
        let err = run_with_timeout("sleep", &["5"], Some(Duration::from_millis(200)))
            .unwrap_err();
        assert!(matches!(err, StepError::TimedOut { .. }));
    }

    #[test]
    fn fast_command_finishes_under_timeout() {
        let out = run_with_timeout("echo", &["ok"], Some(Duration::from_secs(5))).unwrap();
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "ok");
    }

    #[test]
    fn probe_capture_maps_spawn_failure_to_probe_error() {
        let err = probe_capture("package:nginx", "definitely-not-a-real-tool-xyz", &[])
            .unwrap_err();
        assert!(matches!(err, StepError::Probe { .. }));
    }
}
