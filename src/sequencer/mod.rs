//! Runs provisioning steps in order, one at a time.
//!
//! Each step is skipped when its precondition is already satisfied, gated by
//! the confirmation provider when it carries a question, and otherwise
//! executed once. Failures are warnings unless the step is marked
//! abort-on-failure.
//!
//! There is no rollback: interrupting the process mid-step can leave partial
//! state behind, and the next run picks up from whatever preconditions hold.

pub mod confirm;
pub mod ownership;
pub mod runner;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::console::Console;
use crate::error::{SequenceError, StepError};
use crate::model::step::{Action, CommandSpec, FailurePolicy, ProvisioningStep};
use crate::outcome::{RunReport, StepOutcome};

use confirm::Confirm;
use ownership::Owner;
use runner::CommandRunner;

pub struct Sequencer<'a> {
    runner: &'a mut dyn CommandRunner,
    confirm: &'a mut dyn Confirm,
    console: &'a mut Console,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        runner: &'a mut dyn CommandRunner,
        confirm: &'a mut dyn Confirm,
        console: &'a mut Console,
    ) -> Self {
        Self {
            runner,
            confirm,
            console,
        }
    }

    pub fn run(&mut self, steps: &[ProvisioningStep]) -> Result<RunReport, SequenceError> {
        let total = steps.len();
        let mut report = RunReport::default();

        for (index, step) in steps.iter().enumerate() {
            self.console.step(index + 1, total, &step.name);
            let outcome = self.run_step(step);

            match &outcome {
                StepOutcome::Skipped => {
                    tracing::info!(step = %step.name, "skipped: precondition satisfied");
                    self.console.skipped("already done");
                }
                StepOutcome::Declined => {
                    tracing::info!(step = %step.name, "declined");
                    self.console.declined();
                }
                StepOutcome::Completed(detail) => {
                    tracing::info!(step = %step.name, detail = ?detail, "completed");
                    self.console.completed(detail.as_deref());
                }
                StepOutcome::Failed(err) => {
                    tracing::warn!(step = %step.name, "failed: {err}");
                    self.console.warn(&err.to_string());
                }
            }

            if step.on_failure == FailurePolicy::Abort {
                if let StepOutcome::Failed(source) = outcome {
                    tracing::error!(step = %step.name, "aborting sequence");
                    return Err(SequenceError::Aborted {
                        step: step.name.clone(),
                        source,
                    });
                }
            }

            report.push(step.name.clone(), outcome);
        }

        Ok(report)
    }

    fn run_step(&mut self, step: &ProvisioningStep) -> StepOutcome {
        match step.precondition.check() {
            Ok(true) => return StepOutcome::Skipped,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(step = %step.name, "{err}; running step");
            }
        }

        if let Some(question) = step.confirm.as_deref() {
            if !self.confirm.confirm(question) {
                return StepOutcome::Declined;
            }
        }

        match self.execute(&step.action) {
            Ok(detail) => StepOutcome::Completed(detail),
            Err(err) => StepOutcome::Failed(err),
        }
    }

    fn execute(&mut self, action: &Action) -> Result<Option<String>, StepError> {
        match action {
            Action::Command(cmd) => {
                self.runner.run(cmd)?;
                Ok(None)
            }
            Action::CreateDirs(dirs) => {
                let mut created = 0;
                for dir in dirs {
                    if !dir.is_dir() {
                        fs::create_dir_all(dir).map_err(|err| StepError::io(dir, err))?;
                        created += 1;
                    }
                }
                Ok(Some(format!("{created} created")))
            }
            Action::WriteFile {
                path,
                contents,
                mode,
            } => {
                write_file(path, contents, *mode)?;
                Ok(Some(path.display().to_string()))
            }
            Action::Download { url, dest } => {
                self.download(url, dest)?;
                Ok(Some(dest.display().to_string()))
            }
            Action::InstallWrappers { dir, wrappers } => {
                for wrapper in wrappers {
                    write_file(&dir.join(&wrapper.name), &wrapper.render(), 0o755)?;
                }
                let names: Vec<&str> = wrappers.iter().map(|w| w.name.as_str()).collect();
                Ok(Some(names.join(", ")))
            }
            Action::FixOwnership { owner, paths } => {
                let resolved = Owner::parse(owner)?;
                let changed = ownership::fix_ownership(resolved, paths)?;
                Ok(Some(format!("{changed} entries changed")))
            }
            Action::Summary(text) => {
                self.console.text(text);
                Ok(None)
            }
        }
    }

    /// Fetch into `<dest>.part` and rename on success, so a partial artifact
    /// never satisfies the destination's precondition.
    fn download(&mut self, url: &str, dest: &Path) -> Result<(), StepError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| StepError::io(parent, err))?;
        }

        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);

        let cmd = CommandSpec::new("wget")
            .args(["-q", "--show-progress", "-O"])
            .arg(part.to_string_lossy())
            .arg(url);

        if let Err(err) = self.runner.run(&cmd) {
            let _ = fs::remove_file(&part);
            return Err(StepError::Download {
                url: url.to_string(),
                reason: err.to_string(),
            });
        }

        fs::rename(&part, dest).map_err(|err| {
            let _ = fs::remove_file(&part);
            StepError::io(dest, err)
        })
    }
}

fn write_file(path: &Path, contents: &str, mode: u32) -> Result<(), StepError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StepError::io(parent, err))?;
    }
    fs::write(path, contents).map_err(|err| StepError::io(path, err))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|err| StepError::io(path, err))
}
