//! Command-line entry point.
//!
//! Parses the command line, loads configuration, wires the real collaborators
//! into an [`ActionSequencer`] and maps the outcome to an exit code:
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | success, including degraded instant mode |
//! | 1 | setup failure, or an animation failure in `test` |
//! | 2 | the power action itself failed |
//! | 130 | interrupted by a signal |

use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use power_manager::cleanup::{CleanupCoordinator, WayfireIpc};
use power_manager::infrastructure::{animation_search_roots, cancel_on_signal, ANIMATIONS_DIR_ENV};
use power_manager::observability::init_tracing;
use power_manager::power::CommandInvoker;
use power_manager::registry::{discover, HandlerRegistry};
use power_manager::sequencer::ClockJumpWake;
use power_manager::supervisor::ProcessLauncher;
use power_manager::{ActionSequencer, Config, PowerActionKind, PowerManagerError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Compositor IPC calls give up after this long.
const IPC_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "power-manager", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, env = "POWER_MANAGER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Power off.
    Shutdown(ActionArgs),
    /// Restart.
    Reboot(ActionArgs),
    /// Suspend to RAM and restore the desktop on resume.
    Suspend(ActionArgs),
    /// Suspend to disk and restore the desktop on resume.
    Hibernate(ActionArgs),
    /// End the login session.
    Logout(ActionArgs),
    /// Restart into Windows.
    Windows(ActionArgs),
    /// Play an animation without performing any power action.
    Test(TestArgs),
    /// Print the discovered animations.
    List,
}

#[derive(Debug, Args)]
struct ActionArgs {
    /// Animation to play, or `none`.
    #[arg(short, long, value_name = "NAME")]
    animation: Option<String>,
}

#[derive(Debug, Args)]
struct TestArgs {
    #[command(flatten)]
    action: ActionArgs,

    /// Seconds to keep the covered screen before cleaning up.
    #[arg(long, value_name = "SECONDS")]
    hold: Option<u64>,
}

impl Command {
    fn kind(&self) -> Option<PowerActionKind> {
        match self {
            Self::Shutdown(_) => Some(PowerActionKind::Shutdown),
            Self::Reboot(_) => Some(PowerActionKind::Reboot),
            Self::Suspend(_) => Some(PowerActionKind::Suspend),
            Self::Hibernate(_) => Some(PowerActionKind::Hibernate),
            Self::Logout(_) => Some(PowerActionKind::Logout),
            Self::Windows(_) => Some(PowerActionKind::Windows),
            Self::Test(_) | Self::List => None,
        }
    }

    fn animation(&self) -> Option<&str> {
        match self {
            Self::Shutdown(args)
            | Self::Reboot(args)
            | Self::Suspend(args)
            | Self::Hibernate(args)
            | Self::Logout(args)
            | Self::Windows(args)
            | Self::Test(TestArgs { action: args, .. }) => args.animation.as_deref(),
            Self::List => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_cli() {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("power-manager: invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    if cli.verbose {
        config.trace_level = "debug".to_string();
    }
    if let Command::Test(TestArgs { hold: Some(hold), .. }) = &cli.command {
        config.hold_seconds = *hold;
    }

    init_tracing(&config);

    let (registry, root) = discover_animations(&config);

    if matches!(cli.command, Command::List) {
        print_animations(&registry, root.as_deref());
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(run(cli.command, config, registry, root))
}

/// Parses arguments with the discovered animations appended to `--help`.
fn parse_cli() -> Result<Cli, clap::Error> {
    let config = Config::load(None).unwrap_or_default();
    let (registry, _) = discover_animations(&config);
    let available = if registry.is_empty() {
        "none found".to_string()
    } else {
        registry.list_available().join(", ")
    };

    let matches = Cli::command()
        .after_help(format!("Available animations: {available}"))
        .try_get_matches()?;
    Cli::from_arg_matches(&matches)
}

fn discover_animations(config: &Config) -> (HandlerRegistry, Option<PathBuf>) {
    let override_dir = std::env::var_os(ANIMATIONS_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    let configured = config.animations_dir();
    discover(&animation_search_roots(
        override_dir.as_deref(),
        configured.as_deref(),
    ))
}

fn print_animations(registry: &HandlerRegistry, root: Option<&std::path::Path>) {
    match root {
        Some(root) => println!("Animations in {}:", root.display()),
        None => println!("No animation directory found."),
    }
    for name in registry.list_available() {
        println!("  {name}");
    }
}

async fn run(
    command: Command,
    config: Config,
    registry: HandlerRegistry,
    root: Option<PathBuf>,
) -> ExitCode {
    let interrupt = CancellationToken::new();
    if let Err(e) = cancel_on_signal(interrupt.clone()) {
        tracing::error!(error = %e, "failed to register signal handlers");
        return ExitCode::from(1);
    }

    let cleanup = CleanupCoordinator::new(
        Box::new(WayfireIpc::from_env(IPC_TIMEOUT)),
        config.retry_policy(),
    );
    let sequencer = ActionSequencer::new(
        registry,
        Box::new(ProcessLauncher::new(root, config.terminate_grace())),
        Box::new(CommandInvoker::new(config.commands.clone())),
        Box::new(ClockJumpWake::default()),
        cleanup,
        config.sequencer_settings(),
    );

    let request = match command.kind() {
        Some(kind) => sequencer.request(kind, command.animation(), false),
        None => sequencer.request(PowerActionKind::Shutdown, command.animation(), true),
    };

    let report = sequencer.run(request, interrupt).await;
    for degradation in &report.degradations {
        tracing::debug!(reason = %degradation, "degraded");
    }

    match report.error() {
        None => ExitCode::SUCCESS,
        Some(e) => {
            eprintln!("power-manager: {e}");
            ExitCode::from(exit_code(e))
        }
    }
}

const fn exit_code(error: &PowerManagerError) -> u8 {
    match error {
        PowerManagerError::Interrupted => 130,
        PowerManagerError::ActionInvocation { .. } => 2,
        _ => 1,
    }
}
