use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::StepError;
use crate::model::wrapper::Wrapper;

/// What happens to the rest of the sequence when a step's action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Print a warning and continue with the next step.
    #[default]
    Warn,
    /// Stop the sequence; the process exits non-zero.
    Abort,
}

/// Filesystem check deciding whether a step still needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// No completion check; the step always runs.
    Always,
    PathExists(PathBuf),
    AllPathsExist(Vec<PathBuf>),
}

impl Precondition {
    /// `Ok(true)` when the step's work is already present on disk.
    ///
    /// A check that cannot be evaluated is an error; callers treat it as
    /// "step needed".
    pub fn check(&self) -> Result<bool, StepError> {
        match self {
            Precondition::Always => Ok(false),
            Precondition::PathExists(path) => exists(path),
            Precondition::AllPathsExist(paths) => {
                if paths.is_empty() {
                    return Ok(false);
                }
                for path in paths {
                    if !exists(path)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.check().unwrap_or(false)
    }
}

fn exists(path: &Path) -> Result<bool, StepError> {
    path.try_exists().map_err(|source| StepError::PreconditionCheck {
        path: path.to_path_buf(),
        source,
    })
}

/// A single external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Command(CommandSpec),
    CreateDirs(Vec<PathBuf>),
    /// Full overwrite; never merges with existing content.
    WriteFile {
        path: PathBuf,
        contents: String,
        mode: u32,
    },
    Download {
        url: String,
        dest: PathBuf,
    },
    InstallWrappers {
        dir: PathBuf,
        wrappers: Vec<Wrapper>,
    },
    FixOwnership {
        owner: String,
        paths: Vec<PathBuf>,
    },
    Summary(String),
}

impl Action {
    pub fn describe(&self) -> String {
        match self {
            Action::Command(cmd) => cmd.to_string(),
            Action::CreateDirs(dirs) => format!("mkdir -p ({} dirs)", dirs.len()),
            Action::WriteFile { path, mode, .. } => {
                format!("write {} (mode {mode:o})", path.display())
            }
            Action::Download { url, dest } => format!("fetch {url} -> {}", dest.display()),
            Action::InstallWrappers { dir, wrappers } => {
                format!("install {} wrappers into {}", wrappers.len(), dir.display())
            }
            Action::FixOwnership { owner, paths } => {
                format!("chown -R {owner} ({} paths)", paths.len())
            }
            Action::Summary(_) => "print summary".to_string(),
        }
    }
}

/// One idempotent, independently failable unit of environment setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningStep {
    pub name: String,
    pub precondition: Precondition,
    pub action: Action,
    /// Question asked before running; anything but an explicit yes declines.
    pub confirm: Option<String>,
    pub on_failure: FailurePolicy,
}

impl ProvisioningStep {
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            precondition: Precondition::Always,
            action,
            confirm: None,
            on_failure: FailurePolicy::Warn,
        }
    }

    pub fn skip_when(mut self, precondition: Precondition) -> Self {
        self.precondition = precondition;
        self
    }

    pub fn confirm_with(mut self, question: impl Into<String>) -> Self {
        self.confirm = Some(question.into());
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }
}
