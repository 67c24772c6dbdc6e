//! Line input for the headless console
//!
//! Lines starting with `:` are console commands; anything else is sent to
//! the device as-is. [`spawn_line_reader`] feeds lines from a blocking reader.

use std::fmt;
use std::io::{self, BufRead};
use tokio::sync::mpsc;

/// Prefix marking a console command
pub const COMMAND_PREFIX: char = ':';

/// Separator between items of a `:batch` command
pub const BATCH_SEPARATOR: char = ';';

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Open the active port
    Open,
    /// Close the connection
    Close,
    /// Clear the active session
    Clear,
    /// Switch the active session
    Port(String),
    /// List available ports
    Ports,
    /// Send several lines spaced in time
    Batch(Vec<String>),
    /// Leave the console
    Quit,
    /// Send a line to the device
    Send(String),
}

/// Error for a `:` line that is not a known command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown command '{}' (try :open, :close, :clear, :port NAME, :ports, :batch a;b, :quit)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCommand {}

impl ConsoleCommand {
    /// Parse one input line (without its newline)
    pub fn parse(line: &str) -> Result<Self, UnknownCommand> {
        let Some(rest) = line.strip_prefix(COMMAND_PREFIX) else {
            return Ok(Self::Send(line.to_string()));
        };

        // "::text" sends ":text" verbatim
        if rest.starts_with(COMMAND_PREFIX) {
            return Ok(Self::Send(rest.to_string()));
        }

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest.trim(), ""),
        };

        match (name.to_ascii_lowercase().as_str(), arg) {
            ("open", "") => Ok(Self::Open),
            ("close", "") => Ok(Self::Close),
            ("clear", "") => Ok(Self::Clear),
            ("ports", "") => Ok(Self::Ports),
            ("quit" | "exit", "") => Ok(Self::Quit),
            ("port", name) if !name.is_empty() => Ok(Self::Port(name.to_string())),
            ("batch", items) => Ok(Self::Batch(
                items
                    .split(BATCH_SEPARATOR)
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => Err(UnknownCommand(line.to_string())),
        }
    }
}

/// Forward lines from a blocking reader over a channel
///
/// The reader runs on its own named thread rather than a runtime blocking
/// task, so a read stuck waiting for input never holds up runtime shutdown.
/// The channel closes at end of input or once the receiver is dropped.
pub fn spawn_line_reader<R>(name: &str, reader: R) -> io::Result<mpsc::Receiver<io::Result<String>>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            for line in reader.lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}
