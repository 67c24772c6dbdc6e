//! Session manager
//!
//! Owns one text buffer per port, at most one open connection, and the timed
//! send sequences queued against it. All operations are synchronous and
//! non-blocking; a front-end calls [`SessionManager::poll`] and
//! [`SessionManager::pump_sequences`] on its own timer.
//!
//! State machine:
//! - `Disconnected` → `Connected(port)` via a successful `open`
//! - `Connected(port)` → `Disconnected` via `close`, or via a read failure
//!   surfaced by `poll`

use super::log::SessionLog;
use super::sequence::{CompletionCallback, SendSequence};
use crate::communication::{ports, PortDescriptor, SerialLink, Transport, Utf8StreamDecoder};
use commconsole_core::{
    EventDispatcher, LineConfig, Result, SequenceId, SequenceReport, SessionError, SessionEvent,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

/// Interval at which front-ends are expected to call `poll`
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default spacing between items of a send sequence
pub const DEFAULT_SEND_SPACING: Duration = Duration::from_millis(300);

/// Lower bound on send sequence spacing
pub const MIN_SEND_SPACING: Duration = Duration::from_millis(50);

/// Session manager configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Appended to every sent line
    pub line_terminator: String,
    /// Floor applied to `send_many` spacing
    pub min_send_spacing: Duration,
    /// Per-session character cap (unbounded when `None`)
    pub max_buffer_chars: Option<usize>,
    /// Largest single read issued while draining the driver buffer
    pub read_chunk_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            line_terminator: "\n".to_string(),
            min_send_spacing: MIN_SEND_SPACING,
            max_buffer_chars: None,
            read_chunk_size: 4096,
        }
    }
}

/// Connection state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection is open
    Disconnected,
    /// A connection is open on the named port
    Connected(String),
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected(port) => write!(f, "Connected({})", port),
        }
    }
}

enum Delivery {
    Written,
    Skipped,
}

struct Connection {
    port: String,
    config: LineConfig,
    link: Box<dyn SerialLink>,
    decoder: Utf8StreamDecoder,
}

/// Read everything the driver reports as waiting
///
/// Bytes read before a failure are returned alongside the error.
fn read_waiting(link: &mut dyn SerialLink, chunk_size: usize) -> (Vec<u8>, Option<io::Error>) {
    let waiting = match link.bytes_to_read() {
        Ok(0) => return (Vec::new(), None),
        Ok(n) => n,
        Err(e) => return (Vec::new(), Some(e)),
    };

    let mut data = Vec::with_capacity(waiting);
    let mut buf = vec![0u8; chunk_size.clamp(1, waiting)];
    while data.len() < waiting {
        let want = (waiting - data.len()).min(buf.len());
        match link.read(&mut buf[..want]) {
            Ok(0) if data.is_empty() => {
                let e = io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "device reports readiness to read but returned no data \
                     (device disconnected or multiple access on port?)",
                );
                return (data, Some(e));
            }
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return (data, Some(e)),
        }
    }
    (data, None)
}

/// Per-port session buffers plus the single live connection
pub struct SessionManager {
    transport: Box<dyn Transport>,
    config: ManagerConfig,
    sessions: HashMap<String, SessionLog>,
    active: Option<String>,
    connection: Option<Connection>,
    sequences: Vec<SendSequence>,
    events: Option<EventDispatcher>,
}

impl SessionManager {
    /// Create a manager with default configuration
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_config(transport, ManagerConfig::default())
    }

    /// Create a manager with the given configuration
    pub fn with_config(transport: Box<dyn Transport>, config: ManagerConfig) -> Self {
        Self {
            transport,
            config,
            sessions: HashMap::new(),
            active: None,
            connection: None,
            sequences: Vec::new(),
            events: None,
        }
    }

    /// Publish session events on `events`
    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = Some(events);
        self
    }

    /// Event dispatcher, if one was attached
    pub fn events(&self) -> Option<&EventDispatcher> {
        self.events.as_ref()
    }

    /// Manager configuration
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        match &self.connection {
            Some(conn) => ConnectionState::Connected(conn.port.clone()),
            None => ConnectionState::Disconnected,
        }
    }

    /// Whether a connection is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Port the open connection is bound to
    pub fn connected_port(&self) -> Option<&str> {
        self.connection.as_ref().map(|conn| conn.port.as_str())
    }

    /// Line settings of the open connection
    pub fn line_config(&self) -> Option<&LineConfig> {
        self.connection.as_ref().map(|conn| &conn.config)
    }

    /// Key of the active session
    pub fn active_key(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Buffered text of a session, if it exists
    pub fn buffer(&self, key: &str) -> Option<&str> {
        self.sessions.get(key).map(SessionLog::as_str)
    }

    /// Keys of every session created so far, sorted
    pub fn session_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of send sequences still running
    pub fn pending_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Ports visible to the transport (never empty)
    pub fn list_ports(&self) -> Vec<PortDescriptor> {
        ports::list_ports(self.transport.as_ref())
    }

    /// Device whose hardware id contains `needle`
    pub fn find_port_by_hardware_id(&self, needle: &str) -> Option<String> {
        let ports = self.list_ports();
        ports::find_port_by_hardware_id(&ports, needle)
    }

    fn session_mut(&mut self, key: &str) -> &mut SessionLog {
        let limit = self.config.max_buffer_chars;
        self.sessions
            .entry(key.to_string())
            .or_insert_with(|| SessionLog::with_capacity_limit(limit))
    }

    /// Session that received text is appended to: the active one, else `port`
    fn display_key(&self, port: &str) -> String {
        self.active.clone().unwrap_or_else(|| port.to_string())
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // No subscribers is not an error for the manager
            let _ = events.publish(event);
        }
    }

    /// Switch the active session to `key`
    ///
    /// `displayed` is the text the front-end currently shows; it is stored
    /// into the previously active session before switching. Returns the
    /// buffered text of `key`, creating an empty session if needed.
    pub fn set_active(&mut self, key: &str, displayed: Option<&str>) -> String {
        if let (Some(previous), Some(text)) = (self.active.clone(), displayed) {
            self.session_mut(&previous).replace(text);
        }

        let changed = self.active.as_deref() != Some(key);
        self.active = Some(key.to_string());
        let text = self.session_mut(key).as_str().to_string();

        if changed {
            self.emit(SessionEvent::ActiveChanged {
                port: key.to_string(),
            });
        }
        text
    }

    /// Open a connection on `key`
    ///
    /// Fails with `AlreadyConnected` while a connection is live, leaving it
    /// untouched. On success the session for `key` becomes active.
    pub fn open(&mut self, key: &str, config: &LineConfig) -> Result<()> {
        if let Some(conn) = &self.connection {
            return Err(SessionError::AlreadyConnected {
                port: conn.port.clone(),
            });
        }
        // A connect attempt creates the session even if the open fails
        self.session_mut(key);
        config.validate()?;

        let link = self.transport.open(key, config)?;
        self.connection = Some(Connection {
            port: key.to_string(),
            config: *config,
            link,
            decoder: Utf8StreamDecoder::new(),
        });

        if self.active.as_deref() != Some(key) {
            self.active = Some(key.to_string());
            self.emit(SessionEvent::ActiveChanged {
                port: key.to_string(),
            });
        }

        tracing::info!(
            "Connected to {} via {} transport ({})",
            key,
            self.transport.name(),
            config
        );
        self.emit(SessionEvent::Connected {
            port: key.to_string(),
        });
        Ok(())
    }

    /// Close the connection, if any
    ///
    /// Close errors are logged and swallowed. Pending send sequences are
    /// cancelled. Calling this while disconnected does nothing.
    pub fn close(&mut self) {
        let Some(conn) = self.connection.take() else {
            return;
        };
        let port = conn.port.clone();
        self.teardown(conn);

        tracing::info!("Disconnected from {}", port);
        self.emit(SessionEvent::Disconnected { port });
    }

    fn teardown(&mut self, mut conn: Connection) {
        if let Err(e) = conn.link.close() {
            tracing::debug!("Ignoring close error on {}: {}", conn.port, e);
        }

        let rest = conn.decoder.finish();
        if !rest.is_empty() {
            let target = self.display_key(&conn.port);
            self.session_mut(&target).append(&rest);
        }

        self.cancel_all_sequences();
    }

    /// Empty the buffer of `key`
    ///
    /// Returns true when `key` is the active session, meaning the visible
    /// text must be cleared as well. The connection is not affected.
    pub fn clear(&mut self, key: &str) -> bool {
        self.session_mut(key).clear();
        self.emit(SessionEvent::Cleared {
            port: key.to_string(),
        });
        self.active.as_deref() == Some(key)
    }

    /// Drain bytes waiting on the connection
    ///
    /// Never blocks. Returns the decoded text appended to the active session
    /// (the connected port's session when none is active), or `None` when
    /// nothing complete arrived. A read error force-closes the connection and
    /// is returned as `ConnectionLost`; text read before the failure is still
    /// appended.
    pub fn poll(&mut self) -> Result<Option<String>> {
        let chunk_size = self.config.read_chunk_size;
        let Some(conn) = self.connection.as_mut() else {
            return Ok(None);
        };

        let (bytes, failure) = read_waiting(conn.link.as_mut(), chunk_size);
        let text = if bytes.is_empty() {
            String::new()
        } else {
            conn.decoder.decode(&bytes)
        };
        let port = conn.port.clone();

        if !text.is_empty() {
            let target = self.display_key(&port);
            tracing::trace!("Received {} bytes on {} into {}", bytes.len(), port, target);
            self.session_mut(&target).append(&text);
            self.emit(SessionEvent::DataReceived {
                port: target,
                text: text.clone(),
            });
        }

        if let Some(e) = failure {
            let detail = e.to_string();
            tracing::warn!("Serial port {} failed while reading: {}", port, detail);
            if let Some(conn) = self.connection.take() {
                self.teardown(conn);
            }
            self.emit(SessionEvent::ConnectionLost {
                port: port.clone(),
                detail: detail.clone(),
            });
            return Err(SessionError::ConnectionLost { port, detail });
        }

        Ok((!text.is_empty()).then_some(text))
    }

    /// Send one line to `key`
    ///
    /// Writes `text` plus the line terminator and echoes both into the
    /// session. A no-op when disconnected or when `key` is not the connected
    /// port. Write errors are returned as `SendFailed` and leave the
    /// connection open.
    pub fn send(&mut self, key: &str, text: &str) -> Result<()> {
        self.deliver(key, text).map(|_| ())
    }

    fn deliver(&mut self, key: &str, text: &str) -> Result<Delivery> {
        let Some(conn) = self.connection.as_mut() else {
            tracing::debug!("Not connected, dropping send to {}", key);
            return Ok(Delivery::Skipped);
        };
        if conn.port != key {
            tracing::debug!(
                "Connected to {}, dropping send addressed to {}",
                conn.port,
                key
            );
            return Ok(Delivery::Skipped);
        }

        let mut payload = String::with_capacity(text.len() + self.config.line_terminator.len());
        payload.push_str(text);
        payload.push_str(&self.config.line_terminator);

        if let Err(e) = conn
            .link
            .write_all(payload.as_bytes())
            .and_then(|()| conn.link.flush())
        {
            tracing::warn!("Failed to write to {}: {}", key, e);
            return Err(SessionError::SendFailed {
                port: key.to_string(),
                detail: e.to_string(),
            });
        }

        self.session_mut(key).append(&payload);
        self.emit(SessionEvent::DataSent {
            port: key.to_string(),
            text: payload,
        });
        Ok(Delivery::Written)
    }

    /// Queue `items` to be sent to `key` one per `spacing`
    ///
    /// Spacing below the configured floor is raised to it. The first item is
    /// due immediately and goes out on the next `pump_sequences` call.
    /// `on_complete` fires exactly once: synchronously for an empty list
    /// (which returns `None`), otherwise after the last item or on
    /// cancellation.
    pub fn send_many<I, S, F>(
        &mut self,
        key: &str,
        items: I,
        spacing: Duration,
        on_complete: F,
    ) -> Option<SequenceId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(SequenceReport) + Send + 'static,
    {
        let items: VecDeque<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            on_complete(SequenceReport::default());
            return None;
        }

        let interval = spacing.max(self.config.min_send_spacing);
        let count = items.len();
        let callback: CompletionCallback = Box::new(on_complete);
        let sequence = SendSequence::new(key.to_string(), items, interval, Instant::now(), callback);
        let id = sequence.id;

        tracing::debug!(
            "Queued sequence {} of {} items for {} every {:?}",
            id,
            count,
            key,
            interval
        );
        self.sequences.push(sequence);
        Some(id)
    }

    /// Send every sequence item that is due at `now`
    ///
    /// Each sequence releases at most one item per call. Finished sequences
    /// fire their completion callback. Returns the number of items written.
    pub fn pump_sequences(&mut self, now: Instant) -> usize {
        if self.sequences.is_empty() {
            return 0;
        }

        let mut sequences = std::mem::take(&mut self.sequences);
        let mut written = 0;
        for sequence in sequences.iter_mut() {
            let Some(item) = sequence.take_due(now) else {
                continue;
            };
            match self.deliver(&sequence.port, &item) {
                Ok(Delivery::Written) => {
                    sequence.report.sent += 1;
                    written += 1;
                }
                Ok(Delivery::Skipped) => sequence.report.skipped += 1,
                Err(e) => {
                    tracing::warn!("Sequence {} item failed: {}", sequence.id, e);
                    sequence.report.failed += 1;
                }
            }
        }

        for sequence in sequences {
            if sequence.is_drained() {
                self.finish_sequence(sequence);
            } else {
                self.sequences.push(sequence);
            }
        }
        written
    }

    /// Cancel a pending sequence
    ///
    /// Its completion fires with the unsent items counted as dropped.
    /// Returns false if no such sequence is pending.
    pub fn cancel_sequence(&mut self, id: SequenceId) -> bool {
        let Some(index) = self.sequences.iter().position(|s| s.id == id) else {
            return false;
        };
        let mut sequence = self.sequences.remove(index);
        sequence.cancel();
        self.finish_sequence(sequence);
        true
    }

    fn cancel_all_sequences(&mut self) {
        for mut sequence in std::mem::take(&mut self.sequences) {
            sequence.cancel();
            self.finish_sequence(sequence);
        }
    }

    fn finish_sequence(&mut self, sequence: SendSequence) {
        let (id, report) = sequence.finish();
        tracing::debug!("Sequence {} finished: {}", id, report);
        self.emit(SessionEvent::SequenceFinished { id, report });
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
        self.cancel_all_sequences();
    }
}
