//! workshopdl - Steam Workshop mod downloader
//!
//! Main entry point for the CLI.
//!
//! # Execution Flow
//!
//! 1. Parse the command line (subcommand + global flags)
//! 2. Initialize logging (console, optional rotating file logs)
//! 3. Create the tokio runtime for subprocess execution
//! 4. Load and validate the layered configuration
//!    (defaults ← `.workshopdl.yaml` ← `SWD_*` environment)
//! 5. Run the requested command and shut the runtime down
//!
//! The download itself is a single call into
//! [`DownloadService::run`](workshopdl::DownloadService): one SteamCMD
//! invocation, one outcome.

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use workshopdl::config::ConfigManager;
use workshopdl::logging::{self, Verbosity};
use workshopdl::services::DownloadService;
use workshopdl::{APP_NAME, VERSION};

#[derive(Debug, Parser)]
#[command(name = "workshopdl", version)]
#[command(about = "A client to manage mods from the Steam Workshop")]
struct Cli {
    /// Config file (default is $HOME/.workshopdl.yaml)
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Info output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Debug output
    #[arg(long, global = true, default_value_t = false)]
    vv: bool,

    /// Keep daily-rotating log files in this directory
    #[arg(long, global = true)]
    log_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download the configured mods
    Download,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = if cli.vv {
        Verbosity::Debug
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Warnings
    };
    let _guard = logging::setup_logging(verbosity, cli.log_dir.as_deref())?;

    tracing::info!("starting {} v{}", APP_NAME, VERSION);

    // One runtime for the whole process; subprocess I/O and the deadline
    // timer run on it.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(4)
        .thread_name("workshopdl-worker")
        .build()?;

    let result = run_command(&cli, &runtime);

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result
}

fn run_command(cli: &Cli, runtime: &tokio::runtime::Runtime) -> Result<()> {
    match cli.command {
        Commands::Download => {
            let manager = ConfigManager::new(cli.config.clone());
            let mut cfg = manager.load()?;
            cfg.resolve_paths()?;
            cfg.validate()?;

            let service = DownloadService::new();
            let report = runtime.block_on(service.run(&cfg))?;

            tracing::info!(
                relocated = report.relocated,
                bytes = report.bytes,
                "download complete"
            );
            println!(
                "relocated {} mod(s) ({} bytes) in {:.1}s",
                report.relocated,
                report.bytes,
                report.duration.as_secs_f64()
            );
            Ok(())
        }
    }
}
