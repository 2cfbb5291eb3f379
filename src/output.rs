//! Rendering of records and session events for the terminal.
use gdbmi_config::OutputFormat;
use gdbmi_proto::{Record, ResultRecord};
use gdbmi_session::{SessionError, SessionEvent};
use serde_json::json;

/// Render one record as a single output line.
pub fn record_line(format: OutputFormat, record: &Record) -> String {
    match format {
        OutputFormat::Text => record.to_string(),
        OutputFormat::Json => {
            serde_json::to_string(record).unwrap_or_else(|err| error_json(None, &err.to_string()))
        }
    }
}

/// Render the result of a command the user typed.
pub fn result_line(format: OutputFormat, record: &ResultRecord) -> String {
    record_line(format, &Record::Result(record.clone()))
}

/// Render an out-of-band event; `None` means nothing is printed.
///
/// Stderr text goes to stderr in text mode, so only the JSON form
/// returns it here.
pub fn event_line(format: OutputFormat, event: &SessionEvent) -> Option<String> {
    match (format, event) {
        (_, SessionEvent::Record(record)) => Some(record_line(format, record)),
        (OutputFormat::Text, SessionEvent::Stderr(_)) => None,
        (OutputFormat::Json, SessionEvent::Stderr(line)) => {
            Some(json!({ "type": "stderr", "line": line }).to_string())
        }
        (OutputFormat::Text, SessionEvent::Exited(code)) => {
            Some(format!("debugger exited with code {code}"))
        }
        (OutputFormat::Json, SessionEvent::Exited(code)) => {
            Some(json!({ "type": "exited", "code": code }).to_string())
        }
    }
}

/// Render a command that produced no result record.
pub fn failure_line(format: OutputFormat, token: u32, err: &SessionError) -> String {
    match format {
        OutputFormat::Text => format!("{token}: {err}"),
        OutputFormat::Json => error_json(Some(token), &err.to_string()),
    }
}

fn error_json(token: Option<u32>, message: &str) -> String {
    json!({ "type": "error", "token": token, "message": message }).to_string()
}
