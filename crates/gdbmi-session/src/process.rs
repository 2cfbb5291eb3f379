//! Debugger process plumbing.
//!
//! Spawns the debugger with piped stdio, pumps its stdout and stderr into a
//! [`Session`] line by line, and reports its exit.
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use crate::error::SessionError;
use crate::session::Session;
use crate::transport::WriterTransport;

/// How long to wait for buffered output after the process has exited.
const DRAIN_TIMEOUT_MS: u64 = 500;

/// Exit code reported when the process ended without one (e.g. a signal).
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebuggerCommand {
    /// Debugger executable, resolved through `PATH` when relative.
    pub program: PathBuf,
    /// Arguments, including the MI interpreter selection.
    pub args: Vec<String>,
    /// Working directory; inherited when `None`.
    pub cwd: Option<PathBuf>,
}

impl DebuggerCommand {
    /// Run `program` with no arguments in the current directory.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Start the debugger in `cwd`.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// A running debugger wired to a [`Session`].
///
/// Dropping the handle kills the process.
pub struct DebuggerProcess {
    session: Arc<Session>,
    pid: Option<u32>,
    kill: CancellationToken,
    exit: Option<JoinHandle<i32>>,
}

impl DebuggerProcess {
    /// Start the debugger. Must be called from within a tokio runtime.
    pub fn spawn(command: &DebuggerCommand, event_capacity: usize) -> Result<Self, SessionError> {
        let mut cmd = TokioCommand::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| SessionError::SpawnFailed(format!("{}: {}", command.program.display(), e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::SpawnFailed("could not capture stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::SpawnFailed("could not capture stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SessionError::SpawnFailed("could not capture stderr".into()))?;

        let session = Arc::new(Session::new(
            Arc::new(WriterTransport::new(stdin)),
            event_capacity,
        ));
        let pid = child.id();
        tracing::info!(pid, program = %command.program.display(), "debugger started");

        let readers = [
            tokio::spawn(pump_lines(stdout, Arc::clone(&session), Source::Stdout)),
            tokio::spawn(pump_lines(stderr, Arc::clone(&session), Source::Stderr)),
        ];
        let kill = CancellationToken::new();
        let exit = tokio::spawn(watch_exit(
            child,
            kill.clone(),
            Arc::clone(&session),
            readers,
        ));

        Ok(Self {
            session,
            pid,
            kill,
            exit: Some(exit),
        })
    }

    /// The session driving this debugger.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// OS process id, if the process was still running when spawned.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the process to exit on its own and return its exit code.
    pub async fn wait(&mut self) -> i32 {
        match self.exit.take() {
            Some(exit) => exit.await.unwrap_or(UNKNOWN_EXIT_CODE),
            None => UNKNOWN_EXIT_CODE,
        }
    }

    /// Ask the debugger to exit, killing it if it has not within `grace`.
    pub async fn shutdown(mut self, grace: Duration) -> i32 {
        let Some(mut exit) = self.exit.take() else {
            return UNKNOWN_EXIT_CODE;
        };
        if let Err(err) = self.session.send("-gdb-exit").await {
            tracing::debug!(error = %err, "could not send -gdb-exit");
        }
        match timeout(grace, &mut exit).await {
            Ok(joined) => joined.unwrap_or(UNKNOWN_EXIT_CODE),
            Err(_) => {
                tracing::warn!(pid = self.pid, "debugger did not exit in time, killing");
                self.kill.cancel();
                exit.await.unwrap_or(UNKNOWN_EXIT_CODE)
            }
        }
    }
}

impl Drop for DebuggerProcess {
    fn drop(&mut self) {
        self.kill.cancel();
    }
}

impl std::fmt::Debug for DebuggerProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebuggerProcess")
            .field("pid", &self.pid)
            .field("session", &self.session)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Stdout,
    Stderr,
}

async fn pump_lines<R>(reader: R, session: Arc<Session>, source: Source)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(?source, error = %err, "debugger output read failed");
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            continue;
        }
        match source {
            // Parse failures are logged by the session.
            Source::Stdout => {
                let _ = session.on_line(line);
            }
            Source::Stderr => session.on_stderr_line(line),
        }
    }
    tracing::debug!(?source, "debugger output closed");
}

async fn watch_exit(
    mut child: Child,
    kill: CancellationToken,
    session: Arc<Session>,
    readers: [JoinHandle<()>; 2],
) -> i32 {
    let status = tokio::select! {
        status = child.wait() => status,
        _ = kill.cancelled() => {
            if let Err(err) = child.kill().await {
                tracing::warn!(error = %err, "failed to kill debugger");
            }
            child.wait().await
        }
    };
    let code = match status {
        Ok(status) => status.code().unwrap_or(UNKNOWN_EXIT_CODE),
        Err(err) => {
            tracing::warn!(error = %err, "failed to wait for debugger");
            UNKNOWN_EXIT_CODE
        }
    };

    // Let buffered results reach the session before failing what is left.
    for reader in readers {
        if timeout(Duration::from_millis(DRAIN_TIMEOUT_MS), reader)
            .await
            .is_err()
        {
            tracing::debug!("debugger output still open after exit");
        }
    }

    tracing::info!(code, "debugger exited");
    session.on_exit(code);
    code
}
