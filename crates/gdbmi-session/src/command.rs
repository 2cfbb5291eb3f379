//! Outgoing command text handling.
use crate::error::SessionError;

/// Prefix that marks a native MI command.
pub const MI_PREFIX: char = '-';

/// Split a caller-supplied leading token off the command text.
///
/// Returns the token, if any, and the trimmed remainder.
pub fn split_token(command: &str) -> Result<(Option<u32>, &str), SessionError> {
    let command = command.trim();
    let digits = command
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(command.len());
    if digits == 0 {
        return Ok((None, command));
    }
    let token = command[..digits]
        .parse::<u32>()
        .map_err(|_| SessionError::InvalidToken(command[..digits].to_string()))?;
    Ok((Some(token), command[digits..].trim_start()))
}

/// Turn command text into an MI command.
///
/// Text that is not already an MI command runs through the console
/// interpreter. Quotes inside console text are passed through as given.
pub fn normalize(text: &str) -> Result<String, SessionError> {
    if text.contains(&['\n', '\r'][..]) {
        return Err(SessionError::MultilineCommand);
    }
    let text = text.trim();
    if text.is_empty() {
        return Err(SessionError::EmptyCommand);
    }
    if text.starts_with(MI_PREFIX) {
        Ok(text.to_string())
    } else {
        Ok(format!("-interpreter-exec console \"{text}\""))
    }
}
