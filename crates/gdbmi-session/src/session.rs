//! Command/result correlation.
//!
//! Every outgoing command gets a token. Result records that come back with
//! a token still in the pending table resolve that command exactly once;
//! everything else is broadcast to subscribers.
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gdbmi_proto::{parse_record, ParseError, Record, ResultRecord};
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;

use crate::command::{normalize, split_token};
use crate::error::{CallbackError, SessionError};
use crate::transport::Transport;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Callback run on a command's result record before its future resolves.
///
/// An error replaces the record as the command's outcome.
pub type ResultCallback =
    Box<dyn FnOnce(&ResultRecord) -> Result<(), CallbackError> + Send + Sync>;

type Outcome = Result<ResultRecord, SessionError>;

/// Things a host observes besides command results.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A prompt, stream or async record, or a result nobody was waiting for.
    Record(Record),
    /// A line the debugger wrote to stderr.
    Stderr(String),
    /// The debugger process exited.
    Exited(i32),
}

struct PendingEntry {
    cancel: Option<CancellationToken>,
    on_result: Option<ResultCallback>,
    sender: oneshot::Sender<Outcome>,
}

/// A sent command awaiting its result.
///
/// Awaiting yields the result record, or the reason there is none.
#[derive(Debug)]
pub struct PendingCommand {
    token: u32,
    command: String,
    receiver: oneshot::Receiver<Outcome>,
}

impl PendingCommand {
    /// Token the command was sent with.
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Command text as sent, without the token.
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Future for PendingCommand {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SessionError::Closed)))
    }
}

/// One conversation with a debugger.
///
/// All methods take `&self`; share the session behind an [`Arc`] between the
/// task sending commands and the tasks feeding output lines.
pub struct Session {
    transport: Arc<dyn Transport>,
    next_token: AtomicU32,
    pending: DashMap<u32, PendingEntry>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Create a session writing through `transport`.
    pub fn new(transport: Arc<dyn Transport>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            transport,
            next_token: AtomicU32::new(1),
            pending: DashMap::new(),
            events,
        }
    }

    /// Subscribe to out-of-band records, stderr lines and exit.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// How many commands are waiting for a result.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Send a command and return a handle to its result.
    pub async fn send(&self, command: &str) -> Result<PendingCommand, SessionError> {
        self.send_with(command, None, None).await
    }

    /// Send a command with an optional result callback and cancellation.
    ///
    /// A leading number in `command` is used as the token; otherwise the
    /// session assigns the next free one. Text not starting with `-` is run
    /// as a console command.
    pub async fn send_with(
        &self,
        command: &str,
        on_result: Option<ResultCallback>,
        cancel: Option<CancellationToken>,
    ) -> Result<PendingCommand, SessionError> {
        let (explicit, text) = split_token(command)?;
        let text = normalize(text)?;
        let (sender, receiver) = oneshot::channel();
        let entry = PendingEntry {
            cancel,
            on_result,
            sender,
        };

        let token = match explicit {
            Some(token) => self.register(token, entry)?,
            None => self.register_generated(entry),
        };

        let registration = Registration {
            pending: &self.pending,
            token,
            armed: true,
        };

        let line = format!("{token}{text}");
        tracing::debug!(token, command = %text, "sending command");
        if let Err(err) = self.transport.write_line(&line).await {
            tracing::warn!(token, error = %err, "command write failed");
            return Err(SessionError::Io(err));
        }
        registration.disarm();

        Ok(PendingCommand {
            token,
            command: text,
            receiver,
        })
    }

    fn register(&self, token: u32, entry: PendingEntry) -> Result<u32, SessionError> {
        match self.pending.entry(token) {
            Entry::Occupied(_) => Err(SessionError::DuplicateToken(token)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(token)
            }
        }
    }

    // Skips 0 and tokens the caller chose explicitly that are still live.
    fn register_generated(&self, entry: PendingEntry) -> u32 {
        loop {
            let token = self.next_token.fetch_add(1, Ordering::Relaxed);
            if token == 0 {
                continue;
            }
            if let Entry::Vacant(slot) = self.pending.entry(token) {
                slot.insert(entry);
                return token;
            }
        }
    }

    /// Feed one stdout line.
    ///
    /// A line that fails to parse is logged and reported; the session stays
    /// usable.
    pub fn on_line(&self, line: &str) -> Result<(), ParseError> {
        let record = match parse_record(line) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, line, "rejected output line");
                return Err(err);
            }
        };
        tracing::debug!(%record, "received record");
        match record {
            Record::Result(result) => self.complete(result),
            other => self.publish(SessionEvent::Record(other)),
        }
        Ok(())
    }

    /// Feed one stderr line.
    pub fn on_stderr_line(&self, line: &str) {
        tracing::warn!(line, "debugger stderr");
        self.publish(SessionEvent::Stderr(line.to_string()));
    }

    /// The debugger exited: fail everything still pending.
    pub fn on_exit(&self, code: i32) {
        let tokens: Vec<u32> = self.pending.iter().map(|entry| *entry.key()).collect();
        for token in tokens {
            if let Some((_, entry)) = self.pending.remove(&token) {
                let _ = entry.sender.send(Err(SessionError::DebuggerExited(code)));
            }
        }
        tracing::debug!(code, "debugger exited");
        self.publish(SessionEvent::Exited(code));
    }

    /// Resolve a pending command with [`SessionError::Cancelled`] now.
    ///
    /// Returns false if no command with this token is pending. A result that
    /// arrives later for the token is treated as unmatched.
    pub fn cancel(&self, token: u32) -> bool {
        match self.pending.remove(&token) {
            Some((_, entry)) => {
                let _ = entry.sender.send(Err(SessionError::Cancelled(token)));
                tracing::debug!(token, "command cancelled");
                true
            }
            None => false,
        }
    }

    fn complete(&self, result: ResultRecord) {
        let token = result.token();
        let Some((_, entry)) = self.pending.remove(&token) else {
            tracing::warn!(token, class = result.class(), "result without a pending command");
            self.publish(SessionEvent::Record(Record::Result(result)));
            return;
        };

        let cancelled = entry
            .cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        let outcome = if cancelled {
            Err(SessionError::Cancelled(token))
        } else {
            match entry.on_result {
                Some(callback) => {
                    let outcome = catch_unwind(AssertUnwindSafe(|| callback(&result)))
                        .unwrap_or_else(|panic| Err(panic_error(panic.as_ref())));
                    match outcome {
                        Ok(()) => Ok(result),
                        Err(source) => Err(SessionError::Callback { token, source }),
                    }
                }
                None => Ok(result),
            }
        };

        tracing::debug!(token, ok = outcome.is_ok(), "command resolved");
        if entry.sender.send(outcome).is_err() {
            tracing::debug!(token, "command handle dropped before its result");
        }
    }

    fn publish(&self, event: SessionEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}

/// Pending-table entry of a command whose write has not finished.
///
/// Dropped while armed (failed write or abandoned `send` future), it takes
/// the entry back out of the table.
struct Registration<'a> {
    pending: &'a DashMap<u32, PendingEntry>,
    token: u32,
    armed: bool,
}

impl Registration<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed && self.pending.remove(&self.token).is_some() {
            tracing::debug!(token = self.token, "command withdrawn before it was written");
        }
    }
}

fn panic_error(panic: &(dyn Any + Send)) -> CallbackError {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");
    format!("result callback panicked: {message}").into()
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("next_token", &self.next_token.load(Ordering::Relaxed))
            .field("pending", &self.pending.len())
            .field("subscribers", &self.events.receiver_count())
            .finish()
    }
}
