use std::io;
use std::process::{Command, Stdio};

use crate::error::StepError;
use crate::model::step::CommandSpec;

/// Executes external commands on behalf of the sequencer.
pub trait CommandRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<(), StepError>;
}

/// Spawns real processes, inheriting stdout/stderr so tool output stays visible.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<(), StepError> {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = cmd.cwd.as_ref() {
            command.current_dir(dir);
        }
        for (key, value) in &cmd.env {
            command.env(key, value);
        }

        tracing::debug!(command = %cmd, cwd = ?cmd.cwd, "spawning");

        let status = command.status().map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => StepError::CommandNotFound {
                program: cmd.program.clone(),
            },
            _ => StepError::io(cmd.cwd.clone().unwrap_or_default(), err),
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(StepError::ExternalCommand {
                command: cmd.to_string(),
                status: status.to_string(),
            })
        }
    }
}
