//! Deploy CLI entrypoint.
//!
//! This is the main entrypoint for the deploy command-line tool.

use std::process::ExitCode;

use dws_deploy::cli::{Cli, Commands, CpuCommands, GpuCommands, LogFormat, OutputFormatter};
use dws_deploy::config::load_dotenv;
use dws_deploy::deployer::{CommandResult, Deployer};
use dws_deploy::dws::ResourceKind;
use dws_deploy::error::{DeployError, Result};
use dws_deploy::report::{Outcome, ResultReporter};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    if let Err(e) = load_dotenv() {
        eprintln!("Warning: {e}");
    }

    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` wins over the verbosity flag when set.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Cancels the token on Ctrl-C.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => debug!("Cannot listen for interrupts: {e}"),
        }
    });
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let config = cli.client_config();
    let deployer = match Deployer::new(&config, cli.poll_policy(), cancel) {
        Ok(deployer) => deployer,
        Err(e) => {
            let outcome = setup_failed(&cli.command, &e);
            ResultReporter::new(config.result_path).report(&outcome).await;
            print!("{}", formatter.format_outcome(&outcome));
            return Err(e);
        }
    };

    let result = match &cli.command {
        Commands::Gpu { command } => cmd_gpu(&deployer, command).await,
        Commands::Cpu { command } => cmd_cpu(&deployer, command).await,
    };

    print!("{}", formatter.format_outcome(&result.outcome));
    result.into_result().map(|_| ())
}

/// Outcome reported when the runner cannot be built.
fn setup_failed(command: &Commands, error: &DeployError) -> Outcome {
    match command {
        Commands::Gpu {
            command: GpuCommands::Create(_),
        } => Outcome::create_failed(ResourceKind::Gpu, error.to_string()),
        Commands::Cpu {
            command: CpuCommands::Create(_),
        } => Outcome::create_failed(ResourceKind::Cpu, error.to_string()),
        Commands::Gpu {
            command: GpuCommands::Delete { uuid },
        } => Outcome::delete_failed(ResourceKind::Gpu, uuid, error.to_string()),
        Commands::Cpu {
            command: CpuCommands::Delete { uuid },
        } => Outcome::delete_failed(ResourceKind::Cpu, uuid, error.to_string()),
    }
}

/// GPU commands.
async fn cmd_gpu(deployer: &Deployer, command: &GpuCommands) -> CommandResult {
    match command {
        GpuCommands::Create(args) => deployer.create_gpu(&args.to_config()).await,
        GpuCommands::Delete { uuid } => deployer.delete(ResourceKind::Gpu, uuid).await,
    }
}

/// CPU commands.
async fn cmd_cpu(deployer: &Deployer, command: &CpuCommands) -> CommandResult {
    match command {
        CpuCommands::Create(args) => deployer.create_cpu(&args.to_config()).await,
        CpuCommands::Delete { uuid } => deployer.delete(ResourceKind::Cpu, uuid).await,
    }
}
