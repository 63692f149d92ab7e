mod app;
mod console;
mod error;
mod model;
mod outcome;
mod plan;
mod sequencer;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use app::{App, confirm_provider};
use console::Console;
use model::config::BootstrapConfig;
use model::variant::Variant;
use sequencer::runner::SystemRunner;

/// devboot -- idempotent bootstrap for development containers.
#[derive(Parser)]
#[command(name = "devboot", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file layered over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provisioning variant.
    #[arg(long, global = true, value_enum)]
    variant: Option<Variant>,

    /// Workspace root the application is cloned into.
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Answer yes to every prompt.
    #[arg(long, global = true, conflicts_with = "no_input")]
    yes: bool,

    /// Never prompt; optional steps are declined.
    #[arg(long, global = true)]
    no_input: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap sequence (default when no subcommand is given).
    Run,
    /// List the steps and whether each would run.
    Plan,
    /// Print the environment file that would be written.
    Env,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging to file (stdout is the user-facing console)
    let log_dir = directories::ProjectDirs::from("", "", "devboot")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "devboot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devboot=info"));
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();

    let mut config = BootstrapConfig::load(cli.config.as_deref())?;
    if let Some(variant) = cli.variant {
        config.general.variant = variant;
    }
    if let Some(root) = cli.workspace {
        config.workspace.root = root;
    }

    tracing::info!(variant = config.general.variant.label(), "devboot starting");

    let timeout = Duration::from_secs(config.general.prompt_timeout_secs);
    let mut app = App::new(config, Console::stdout());

    match cli.command {
        None | Some(Commands::Run) => {
            let mut runner = SystemRunner;
            let mut confirm = confirm_provider(cli.yes, cli.no_input, timeout);
            if let Err(err) = app.bootstrap(&mut runner, confirm.as_mut()) {
                tracing::error!("{err}");
                app.report_abort(&err);
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Plan) => app.print_plan(),
        Some(Commands::Env) => app.print_env(),
    }

    Ok(ExitCode::SUCCESS)
}
