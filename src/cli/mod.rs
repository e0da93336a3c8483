pub mod command;
pub mod shell;
pub mod shutdown;

use std::{
    io::IsTerminal,
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use anyhow::Result;
use clap::Parser;
use shell::{Shell, DEFAULT_TICK};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};

use crate::{
    storage::{
        instance::{InstanceError, SingleInstanceGuard},
        lock::MutexLockProvider,
        repository::FileTimestampRepository,
    },
    timer::service::TimerService,
    utils::{
        clock::SystemClock, dir::create_application_default_path, logging::enable_logging,
        runtime::single_thread_runtime,
    },
};

/// Another process holds the instance marker.
pub const EXIT_ALREADY_RUNNING: u8 = 1;
/// Startup failed for any other reason.
pub const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "lapsed", version, long_about = None)]
#[command(about = "Terminal stopwatch whose total survives restarts and crashes")]
pub struct Args {
    #[arg(
        long,
        help = "Application directory. By default $XDG_DATA_HOME/lapsed or $HOME/.local/share/lapsed"
    )]
    pub dir: Option<PathBuf>,
    #[arg(
        long = "tick-ms",
        help = "How often the display refreshes and a running timer is checkpointed",
        default_value_t = DEFAULT_TICK.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(10..),
    )]
    pub tick_ms: u64,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

/// Files the stopwatch keeps in its application directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data: PathBuf,
    pub lock: PathBuf,
    pub instance: PathBuf,
    pub logs: PathBuf,
}

impl AppPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            data: dir.join("stopwatch.json"),
            lock: dir.join("stopwatch.lock"),
            instance: dir.join("instance.lock"),
            logs: dir.join("logs"),
        }
    }
}

pub fn run_cli(args: Args) -> Result<ExitCode> {
    let dir = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };
    let paths = AppPaths::new(&dir);

    std::fs::create_dir_all(&paths.logs)?;
    enable_logging(&paths.logs, args.log, args.log_console)?;

    let tick = Duration::from_millis(args.tick_ms);
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_app(paths, tick));
    // Stdin is read on a blocking thread that never finishes on its own.
    runtime.shutdown_background();
    result
}

async fn run_app(paths: AppPaths, tick: Duration) -> Result<ExitCode> {
    let guard = SingleInstanceGuard::new(paths.instance.clone())?;
    let instance = match guard.acquire().await {
        Ok(instance) => instance,
        Err(e @ InstanceError::AlreadyRunning { .. }) => {
            warn!("Refusing to start: {e}");
            println!("{e}");
            return Ok(ExitCode::from(EXIT_ALREADY_RUNNING));
        }
        Err(e) => return Err(e.into()),
    };

    let result = run_stopwatch(&paths, tick).await;
    instance.release().await;
    result.map(|_| ExitCode::SUCCESS)
}

async fn run_stopwatch(paths: &AppPaths, tick: Duration) -> Result<()> {
    let lock = MutexLockProvider::new(paths.lock.clone())?;
    let repository = FileTimestampRepository::new(paths.data.clone(), lock)?;
    let mut service = TimerService::load(repository, Box::new(SystemClock)).await?;
    info!("Loaded history from {:?}", paths.data);

    let cancellation = CancellationToken::new();
    tokio::spawn(shutdown::detect_shutdown(cancellation.clone()));

    let shell = Shell::new(
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        Box::new(SystemClock),
        tick,
        cancellation,
    )
    .with_color(std::io::stdout().is_terminal());
    let shell_result = shell.run(&mut service).await;

    if let Err(e) = service.shutdown().await {
        error!("Final stop failed: {e}");
        eprintln!("Failed to save the final stop: {e}");
    }

    shell_result
}
