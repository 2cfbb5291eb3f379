mod cli;
mod output;

use std::env;
use std::fs::OpenOptions;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use gdbmi_config::logging::{prepare_log_file, DEFAULT_MAX_LOG_FILES, DEFAULT_MAX_LOG_SIZE};
use gdbmi_config::{load_config, paths, Config, LogConfig, OutputFormat};
use gdbmi_session::{
    CancellationToken, DebuggerCommand, DebuggerProcess, PendingCommand, SessionError,
    SessionEvent,
};

use crate::cli::Cli;

/// Time given to the event printer to flush after the debugger exits.
const PRINTER_FLUSH: Duration = Duration::from_secs(1);

/// Time the runtime waits for blocked stdin reads on shutdown.
const RUNTIME_SHUTDOWN: Duration = Duration::from_millis(100);

fn init_logging(log: &LogConfig) -> Result<()> {
    let path = log.file.clone().unwrap_or_else(paths::default_log_file);
    prepare_log_file(&path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES)
        .with_context(|| format!("failed to prepare log file: {}", path.display()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    // stdout carries protocol output, so tracing goes to the file only.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log.level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn debugger_command(config: &Config, cli: &Cli) -> DebuggerCommand {
    let mut command = DebuggerCommand::new(&config.debugger.program)
        .args(&config.debugger.args)
        .args(cli.target_args());
    if let Some(cwd) = &config.debugger.cwd {
        command = command.cwd(cwd);
    }
    command
}

/// Print out-of-band events until the debugger exits.
async fn print_events(
    mut events: broadcast::Receiver<SessionEvent>,
    format: OutputFormat,
    exited: CancellationToken,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let SessionEvent::Stderr(line) = &event {
                    if format == OutputFormat::Text {
                        eprintln!("{line}");
                    }
                }
                if let Some(line) = output::event_line(format, &event) {
                    println!("{line}");
                }
                if matches!(event, SessionEvent::Exited(_)) {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    exited.cancel();
}

async fn report(pending: PendingCommand, format: OutputFormat) {
    let token = pending.token();
    match pending.await {
        Ok(record) => println!("{}", output::result_line(format, &record)),
        Err(err) => eprintln!("{}", output::failure_line(format, token, &err)),
    }
}

async fn drive(command: DebuggerCommand, config: Config) -> Result<i32> {
    let format = config.output.format;
    let process = DebuggerProcess::spawn(&command, config.session.event_capacity)
        .context("failed to start debugger")?;
    let session = Arc::clone(process.session());

    let exited = CancellationToken::new();
    let printer = tokio::spawn(print_events(session.subscribe(), format, exited.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = exited.cancelled() => break,
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            debug!("stdin closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match session.send(&line).await {
            Ok(pending) => {
                tokio::spawn(report(pending, format));
            }
            Err(err @ SessionError::Io(_)) => {
                warn!(error = %err, "debugger input closed");
                break;
            }
            Err(err) => eprintln!("gdbmi: {err}"),
        }
    }

    drop(session);
    let grace = Duration::from_secs(config.debugger.shutdown_timeout_secs);
    let code = process.shutdown(grace).await;
    if tokio::time::timeout(PRINTER_FLUSH, printer).await.is_err() {
        debug!("event printer did not finish");
    }
    Ok(code)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config_dir.clone().unwrap_or_else(paths::default_config_dir);
    let project_dir = env::current_dir().ok();
    let config = load_config(&config_dir, project_dir.as_deref())
        .with_context(|| format!("failed to load config from {}", config_dir.display()))?;
    let config = cli
        .configure(config)
        .context("invalid command-line options")?;

    init_logging(&config.log)?;
    info!(program = %config.debugger.program, "starting");

    let command = debugger_command(&config, &cli);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(drive(command, config));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN);

    let code = result?;
    info!(code, "debugger exited");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("gdbmi: {:#}", e);
        std::process::exit(1);
    }
}
