use std::io::{self, IsTerminal};
use std::time::Duration;

use crate::console::Console;
use crate::error::SequenceError;
use crate::model::config::BootstrapConfig;
use crate::model::env_file;
use crate::outcome::RunReport;
use crate::plan;
use crate::sequencer::Sequencer;
use crate::sequencer::confirm::{Confirm, FixedAnswer, StdinConfirm};
use crate::sequencer::runner::CommandRunner;

pub struct App {
    pub config: BootstrapConfig,
    console: Console,
}

impl App {
    pub fn new(config: BootstrapConfig, console: Console) -> Self {
        Self { config, console }
    }

    /// Run the full step plan once, top to bottom.
    pub fn bootstrap(
        &mut self,
        runner: &mut dyn CommandRunner,
        confirm: &mut dyn Confirm,
    ) -> Result<RunReport, SequenceError> {
        tracing::info!(
            variant = self.config.general.variant.label(),
            root = %self.config.workspace_root().display(),
            "bootstrap starting"
        );

        let steps = plan::build(&self.config);
        let report = Sequencer::new(runner, confirm, &mut self.console).run(&steps)?;

        let totals = report.totals_line();
        tracing::info!("bootstrap finished: {totals}");
        self.console.line(&format!("\nbootstrap finished: {totals}"));
        for (name, err) in report.warnings() {
            self.console.warn(&format!("{name}: {err}"));
        }

        Ok(report)
    }

    /// List every step and whether it would run, without running anything.
    pub fn print_plan(&mut self) {
        let steps = plan::build(&self.config);
        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            let state = if step.precondition.is_satisfied() {
                "skip"
            } else if step.confirm.is_some() {
                "ask"
            } else {
                "run"
            };
            self.console.line(&format!(
                "[{}/{total}] {:<4} {}: {}",
                index + 1,
                state,
                step.name,
                step.action.describe()
            ));
        }
    }

    pub fn print_env(&mut self) {
        self.console.text(&env_file::render(&self.config));
    }

    pub fn report_abort(&mut self, err: &SequenceError) {
        let SequenceError::Aborted { source, .. } = err;
        self.console.error(&format!("{err}: {source}"));
    }
}

/// `--yes` wins, then `--no-input`; a non-terminal stdin never blocks on a prompt.
pub fn confirm_provider(yes: bool, no_input: bool, timeout: Duration) -> Box<dyn Confirm> {
    if yes {
        Box::new(FixedAnswer(true))
    } else if no_input || !io::stdin().is_terminal() {
        Box::new(FixedAnswer(false))
    } else {
        Box::new(StdinConfirm::new(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::Captured;
    use crate::error::StepError;
    use crate::model::step::CommandSpec;
    use crate::outcome::StepOutcome;
    use crate::sequencer::confirm::ReaderConfirm;
    use crate::sequencer::ownership::Owner;
    use ignore::WalkBuilder;
    use std::collections::BTreeMap;
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    use std::path::{Path, PathBuf};

    /// Simulates the external tools against the scratch filesystem.
    #[derive(Default)]
    struct FakeTools {
        calls: Vec<CommandSpec>,
        failing: Vec<&'static str>,
    }

    impl FakeTools {
        fn programs(&self) -> Vec<&str> {
            self.calls.iter().map(|c| c.program.as_str()).collect()
        }
    }

    impl CommandRunner for FakeTools {
        fn run(&mut self, cmd: &CommandSpec) -> Result<(), StepError> {
            self.calls.push(cmd.clone());
            if self.failing.contains(&cmd.program.as_str()) {
                return Err(StepError::ExternalCommand {
                    command: cmd.to_string(),
                    status: "exit status: 1".to_string(),
                });
            }
            match cmd.program.as_str() {
                "git" => {
                    let root = PathBuf::from(cmd.args.last().expect("clone target"));
                    fs::create_dir_all(&root).expect("clone root");
                    fs::write(root.join("pyproject.toml"), "[project]\nname = \"app\"\n")
                        .expect("manifest");
                }
                "npm" => {
                    let cwd = cmd.cwd.as_ref().expect("npm cwd");
                    fs::create_dir_all(cwd.join("node_modules")).expect("node_modules");
                }
                "wget" => {
                    let out = &cmd.args[cmd.args.len() - 2];
                    fs::write(out, "weights").expect("download");
                }
                _ => {}
            }
            Ok(())
        }
    }

    fn scratch_config(dir: &Path) -> BootstrapConfig {
        let owner = Owner::current();
        let user = format!(
            r#"
[general]
owner = "{uid}:{gid}"

[workspace]
root = "{base}/workspace/app"
data_root = "{base}/workspace"
bin_dir = "{base}/bin"
"#,
            uid = owner.uid,
            gid = owner.gid,
            base = dir.display()
        );
        BootstrapConfig::from_layers(Some(&user)).expect("scratch config")
    }

    fn bootstrap(
        config: &BootstrapConfig,
        tools: &mut FakeTools,
        confirm: &mut dyn Confirm,
    ) -> RunReport {
        let captured = Captured::default();
        let mut app = App::new(config.clone(), captured.console());
        app.bootstrap(tools, confirm).expect("bootstrap never aborts")
    }

    /// Relative path → file contents (directories map to `None`).
    fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Option<String>> {
        WalkBuilder::new(dir)
            .standard_filters(false)
            .build()
            .flatten()
            .map(|entry| {
                let rel = entry.path().strip_prefix(dir).expect("inside").to_path_buf();
                let contents = if entry.path().is_file() {
                    Some(fs::read_to_string(entry.path()).expect("read"))
                } else {
                    None
                };
                (rel, contents)
            })
            .collect()
    }

    #[test]
    fn second_run_is_idempotent_and_offline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scratch_config(dir.path());

        let mut first = FakeTools::default();
        bootstrap(&config, &mut first, &mut FixedAnswer(true));
        assert_eq!(first.programs(), vec!["git", "pip", "npm", "wget"]);
        let after_first = snapshot(dir.path());

        let mut second = FakeTools::default();
        let report = bootstrap(&config, &mut second, &mut FixedAnswer(true));
        assert_eq!(second.programs(), vec!["pip"]);
        assert_eq!(snapshot(dir.path()), after_first);

        assert!(matches!(
            report.outcome("clone https://github.com/example-org/app.git"),
            Some(StepOutcome::Skipped)
        ));
        assert!(matches!(
            report.outcome("download sample model"),
            Some(StepOutcome::Skipped)
        ));
        assert!(matches!(
            report.outcome("fix ownership"),
            Some(StepOutcome::Completed(_))
        ));
    }

    #[test]
    fn failed_install_still_reaches_ownership_and_summary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scratch_config(dir.path());

        let mut tools = FakeTools {
            failing: vec!["pip"],
            ..Default::default()
        };
        let report = bootstrap(&config, &mut tools, &mut FixedAnswer(false));

        assert!(matches!(
            report.outcome("install python dependencies"),
            Some(StepOutcome::Failed(_))
        ));
        assert!(matches!(
            report.outcome("fix ownership"),
            Some(StepOutcome::Completed(_))
        ));
        assert!(matches!(
            report.outcome("summary"),
            Some(StepOutcome::Completed(_))
        ));
    }

    #[test]
    fn empty_or_eof_prompt_input_downloads_nothing() {
        for input in ["", "\n"] {
            let dir = tempfile::tempdir().expect("tempdir");
            let config = scratch_config(dir.path());

            let mut tools = FakeTools::default();
            let mut prompt = ReaderConfirm::new(Cursor::new(input.as_bytes()), io::sink());
            let report = bootstrap(&config, &mut tools, &mut prompt);

            assert!(!tools.programs().contains(&"wget"));
            assert!(matches!(
                report.outcome("download sample model"),
                Some(StepOutcome::Declined)
            ));
            assert_eq!(report.count("failed"), 0);
        }
    }

    #[test]
    fn env_file_is_reset_to_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scratch_config(dir.path());
        let env_path = config.env_path();
        fs::create_dir_all(env_path.parent().expect("parent")).expect("mkdir");
        fs::write(&env_path, "PORT=1\nMY_SECRET=keep-me\n").expect("seed");

        bootstrap(&config, &mut FakeTools::default(), &mut FixedAnswer(false));

        let written = fs::read_to_string(&env_path).expect("env");
        assert_eq!(written, env_file::render(&config));
        assert!(!written.contains("MY_SECRET"));
    }

    #[test]
    fn created_directories_belong_to_owner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = scratch_config(dir.path());
        // Only root can hand files to another user; otherwise re-own to ourselves.
        let owner = if nix::unistd::Uid::effective().is_root() {
            config.general.owner = "12345:12345".to_string();
            Owner {
                uid: 12345,
                gid: 12345,
            }
        } else {
            Owner::current()
        };

        let report = bootstrap(&config, &mut FakeTools::default(), &mut FixedAnswer(false));
        assert!(matches!(
            report.outcome("fix ownership"),
            Some(StepOutcome::Completed(_))
        ));

        let root = config.workspace_root();
        let mut owned = vec![
            root.to_path_buf(),
            root.parent().expect("parent").to_path_buf(),
            config.workspace.data_root.clone(),
            root.join("node_modules"),
        ];
        owned.extend(config.managed_dirs());
        for path in owned {
            let meta = fs::metadata(&path).expect("exists");
            assert!(meta.is_dir(), "{}", path.display());
            assert_eq!(
                (meta.uid(), meta.gid()),
                (owner.uid, owner.gid),
                "{}",
                path.display()
            );
        }
    }

    #[test]
    fn wrappers_are_executable_and_delegate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scratch_config(dir.path());
        bootstrap(&config, &mut FakeTools::default(), &mut FixedAnswer(false));

        for wrapper in &config.wrappers {
            let path = config.workspace.bin_dir.join(&wrapper.name);
            if !config.general.variant.matches(&wrapper.variants) {
                assert!(!path.exists(), "{}", path.display());
                continue;
            }
            let mode = fs::metadata(&path).expect("wrapper").permissions().mode();
            assert_eq!(mode & 0o777, 0o755);

            let script = fs::read_to_string(&path).expect("read");
            let expected = std::iter::once(wrapper.program.as_str())
                .chain(wrapper.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            assert!(script.contains(&expected), "{script}");
        }
    }

    #[test]
    fn plan_listing_reflects_filesystem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = scratch_config(dir.path());
        bootstrap(&config, &mut FakeTools::default(), &mut FixedAnswer(true));

        let captured = Captured::default();
        let mut app = App::new(config, captured.console());
        app.print_plan();
        let listing = captured.contents();

        assert!(listing.contains("skip create directories"));
        assert!(listing.contains("skip download sample model"));
        assert!(listing.contains("run  fix ownership"));
    }
}
