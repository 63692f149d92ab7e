use std::path::{Path, PathBuf};

use crate::model::config::WrapperConfig;

/// A one-line launcher delegating to one of the application's entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapper {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// Directory the wrapper `cd`s into before delegating.
    pub workdir: PathBuf,
}

impl Wrapper {
    pub fn from_config(config: &WrapperConfig, workdir: &Path) -> Self {
        Self {
            name: config.name.clone(),
            program: config.program.clone(),
            args: config.args.clone(),
            workdir: workdir.to_path_buf(),
        }
    }

    pub fn command_line(&self) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }

    pub fn render(&self) -> String {
        format!(
            "#!/usr/bin/env bash\n# Installed by devboot.\nset -e\ncd {}\nexec {} \"$@\"\n",
            shell_quote(&self.workdir.to_string_lossy()),
            self.command_line()
        )
    }
}

fn shell_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | '+' | ',')
        });
    if safe {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}
