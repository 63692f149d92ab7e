use std::path::PathBuf;

use crate::model::config::BootstrapConfig;
use crate::model::env_file;
use crate::model::step::{Action, CommandSpec, Precondition, ProvisioningStep};
use crate::model::wrapper::Wrapper;

/// The ordered step list for `config`'s workspace and variant.
pub fn build(config: &BootstrapConfig) -> Vec<ProvisioningStep> {
    let variant = config.general.variant;
    let root = config.workspace_root();

    let mut steps = Vec::new();

    let mut dirs: Vec<PathBuf> = Vec::new();
    let candidates = root
        .parent()
        .map(|p| p.to_path_buf())
        .into_iter()
        .chain([config.workspace.data_root.clone()])
        .chain(config.managed_dirs());
    for dir in candidates {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    steps.push(
        ProvisioningStep::new("create directories", Action::CreateDirs(dirs.clone()))
            .skip_when(Precondition::AllPathsExist(dirs.clone())),
    );

    steps.push(
        ProvisioningStep::new(
            format!("clone {}", config.repository.url),
            Action::Command(clone_command(config)),
        )
        .skip_when(Precondition::PathExists(config.marker_path())),
    );

    for install in config
        .install
        .iter()
        .filter(|install| variant.matches(&install.variants))
    {
        let cmd = CommandSpec::new(&install.program)
            .args(install.args.iter().cloned())
            .current_dir(root)
            .env("PIP_DISABLE_PIP_VERSION_CHECK", "1");
        let precondition = install
            .skip_if
            .as_ref()
            .map(|path| Precondition::PathExists(root.join(path)))
            .unwrap_or(Precondition::Always);

        steps.push(
            ProvisioningStep::new(format!("install {}", install.name), Action::Command(cmd))
                .skip_when(precondition)
                .on_failure(install.on_failure),
        );
    }

    steps.push(ProvisioningStep::new(
        format!("write {}", config.env.file),
        Action::WriteFile {
            path: config.env_path(),
            contents: env_file::render(config),
            mode: env_file::file_mode(config),
        },
    ));

    for model in &config.models {
        let dest = config.model_path(model);
        let mut step = ProvisioningStep::new(
            format!("download {}", model.name),
            Action::Download {
                url: model.url.clone(),
                dest: dest.clone(),
            },
        )
        .skip_when(Precondition::PathExists(dest));
        if model.prompt {
            step = step.confirm_with(format!("Download the {} ({})?", model.name, model.file));
        }
        steps.push(step);
    }

    let wrappers = wrappers(config);
    steps.push(ProvisioningStep::new(
        "install wrappers",
        Action::InstallWrappers {
            dir: config.workspace.bin_dir.clone(),
            wrappers: wrappers.clone(),
        },
    ));

    let mut owned = vec![root.to_path_buf()];
    owned.extend(dirs.into_iter().filter(|dir| dir != root));
    steps.push(ProvisioningStep::new(
        "fix ownership",
        Action::FixOwnership {
            owner: config.general.owner.clone(),
            paths: owned,
        },
    ));

    steps.push(ProvisioningStep::new(
        "summary",
        Action::Summary(summary_text(config, &wrappers)),
    ));

    steps
}

pub fn wrappers(config: &BootstrapConfig) -> Vec<Wrapper> {
    config
        .wrappers
        .iter()
        .filter(|wrapper| config.general.variant.matches(&wrapper.variants))
        .map(|wrapper| Wrapper::from_config(wrapper, config.workspace_root()))
        .collect()
}

fn clone_command(config: &BootstrapConfig) -> CommandSpec {
    let repo = &config.repository;
    let mut cmd = CommandSpec::new("git")
        .arg("clone")
        .env("GIT_TERMINAL_PROMPT", "0");
    if let Some(depth) = repo.depth {
        cmd = cmd.arg("--depth").arg(depth.to_string());
    }
    if let Some(branch) = repo.branch.as_ref() {
        cmd = cmd.arg("--branch").arg(branch);
    }
    cmd.arg(&repo.url)
        .arg(config.workspace_root().to_string_lossy())
}

fn summary_text(config: &BootstrapConfig, wrappers: &[Wrapper]) -> String {
    let mut text = format!(
        "\nWorkspace ready ({} variant): {}\n",
        config.general.variant.label(),
        config.workspace_root().display()
    );
    text.push_str(&format!(
        "Environment file: {} (reset to defaults on every bootstrap)\n",
        config.env_path().display()
    ));
    text.push_str(&format!(
        "Data directories: {}\n",
        config.workspace.data_root.display()
    ));

    if !wrappers.is_empty() {
        text.push_str("\nCommands:\n");
        let width = wrappers.iter().map(|w| w.name.len()).max().unwrap_or(0);
        for wrapper in wrappers {
            text.push_str(&format!(
                "  {:width$}  {}\n",
                wrapper.name,
                wrapper.command_line()
            ));
        }
    }

    text.push_str("\nEdit the environment file to add credentials, then start the app.\n");
    text
}
