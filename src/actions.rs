//! Action implementations for the step catalog
//!
//! Actions are the only place the tool mutates the host. They stay
//! dumb on purpose: each wraps one external command or one file write,
//! and idempotence comes from the runner's probe gating, not from the
//! action itself.

use std::fmt;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use convergence::{Action, ActionContext, StepError};

use crate::exec::run_with_timeout;

/// Run one external command
pub struct CommandAction {
    program: String,
    args: Vec<String>,
}

impl CommandAction {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn run(&self, ctx: &ActionContext) -> Result<Option<String>, StepError> {
        log::debug!("exec: {} {}", self.program, self.args.join(" "));

        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let out = run_with_timeout(&self.program, &args, ctx.timeout)?;

        if ctx.verbose && !out.stdout.trim().is_empty() {
            println!("{}", out.stdout.trim_end());
        }

        if !out.success {
            // Keep the external error text verbatim.
            let stderr = out.stderr.trim();
            let detail = if stderr.is_empty() {
                out.stdout.trim()
            } else {
                stderr
            };
            return Err(StepError::action(format!(
                "{} {}: {detail}",
                self.program,
                self.args.join(" ")
            )));
        }

        let trimmed = out.stdout.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
}

impl fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandAction({} {})", self.program, self.args.join(" "))
    }
}

impl Action for CommandAction {
    fn describe(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }

    fn execute(&self, ctx: &ActionContext) -> Result<Option<String>, StepError> {
        self.run(ctx)
    }
}

/// Run several actions in order, stopping at the first failure.
/// Used where one logical step needs more than one operation
/// (e.g. create a venv, install requirements, write a stamp).
#[derive(Debug)]
pub struct SequenceAction {
    description: String,
    actions: Vec<Box<dyn Action>>,
}

impl SequenceAction {
    pub fn new(description: &str, actions: Vec<Box<dyn Action>>) -> Self {
        Self {
            description: description.to_string(),
            actions,
        }
    }
}

impl Action for SequenceAction {
    fn describe(&self) -> String {
        self.description.clone()
    }

    fn execute(&self, ctx: &ActionContext) -> Result<Option<String>, StepError> {
        let mut last = None;
        for action in &self.actions {
            last = action.execute(ctx)?;
        }
        Ok(last)
    }
}

/// Write a file with fixed contents, optionally setting mode and owner
#[derive(Debug)]
pub struct WriteFileAction {
    path: PathBuf,
    contents: String,
    mode: Option<u32>,
    owner: Option<String>,
}

impl WriteFileAction {
    pub fn new(path: PathBuf, contents: String) -> Self {
        Self {
            path,
            contents,
            mode: None,
            owner: None,
        }
    }

    /// Octal permission bits, e.g. `0o640` for configs with secrets
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }
}

impl Action for WriteFileAction {
    fn describe(&self) -> String {
        format!("write {}", self.path.display())
    }

    fn execute(&self, ctx: &ActionContext) -> Result<Option<String>, StepError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StepError::action(format!("{}: {e}", parent.display())))?;
        }

        fs::write(&self.path, &self.contents)
            .map_err(|e| StepError::action(format!("{}: {e}", self.path.display())))?;

        if let Some(mode) = self.mode {
            fs::set_permissions(&self.path, fs::Permissions::from_mode(mode))
                .map_err(|e| StepError::action(format!("{}: {e}", self.path.display())))?;
        }

        if let Some(owner) = &self.owner {
            let path = self.path.display().to_string();
            CommandAction::new("chown", [format!("{owner}:{owner}"), path]).run(ctx)?;
        }

        Ok(None)
    }
}

/// Create (or replace) a symlink, e.g. enabling a proxy site
#[derive(Debug)]
pub struct LinkAction {
    target: PathBuf,
    link: PathBuf,
}

impl LinkAction {
    pub fn new(target: PathBuf, link: PathBuf) -> Self {
        Self { target, link }
    }
}

impl Action for LinkAction {
    fn describe(&self) -> String {
        format!("link {} -> {}", self.link.display(), self.target.display())
    }

    fn execute(&self, ctx: &ActionContext) -> Result<Option<String>, StepError> {
        CommandAction::new(
            "ln",
            [
                "-sf".to_string(),
                self.target.display().to_string(),
                self.link.display().to_string(),
            ],
        )
        .run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_action_captures_output() {
        let action = CommandAction::new("echo", ["converged"]);
        let out = action.execute(&ActionContext::default()).unwrap();
        assert_eq!(out.as_deref(), Some("converged"));
    }

    #[test]
    fn command_failure_keeps_stderr_verbatim() {
        let action = CommandAction::new("ls", ["/definitely/not/a/path"]);
        let err = action.execute(&ActionContext::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("ls /definitely/not/a/path"), "{msg}");
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let action = SequenceAction::new(
            "fail then touch",
            vec![
                Box::new(CommandAction::new("false", Vec::<String>::new())),
                Box::new(CommandAction::new("touch", [marker.display().to_string()])),
            ],
        );

        assert!(action.execute(&ActionContext::default()).is_err());
        assert!(!marker.exists());
    }

    #[test]
    fn sequence_runs_mixed_action_kinds_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let stamp = dir.path().join("done.ok");
        let action = SequenceAction::new(
            "touch then stamp",
            vec![
                Box::new(CommandAction::new("true", Vec::<String>::new())),
                Box::new(WriteFileAction::new(stamp.clone(), "done\n".to_string())),
            ],
        );

        action.execute(&ActionContext::default()).unwrap();
        assert_eq!(fs::read_to_string(&stamp).unwrap(), "done\n");
    }

    #[test]
    fn write_file_creates_parents_and_sets_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.conf");
        let action =
            WriteFileAction::new(path.clone(), "workers = 5\n".to_string()).with_mode(0o640);

        action.execute(&ActionContext::default()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "workers = 5\n");
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn link_action_replaces_existing_link() {
        let dir = tempfile::tempdir().unwrap();
        let target_a = dir.path().join("a");
        let target_b = dir.path().join("b");
        fs::write(&target_a, "").unwrap();
        fs::write(&target_b, "").unwrap();
        let link = dir.path().join("enabled");

        LinkAction::new(target_a.clone(), link.clone())
            .execute(&ActionContext::default())
            .unwrap();
        LinkAction::new(target_b.clone(), link.clone())
            .execute(&ActionContext::default())
            .unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), target_b);
    }
}
