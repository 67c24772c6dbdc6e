//! Scripted transport shared by the integration tests

#![allow(dead_code)]

use commconsole_communication::{PortDescriptor, SerialLink, Transport};
use commconsole_core::{LineConfig, SessionError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

/// What the mock transport has seen and will do next
#[derive(Default)]
pub struct MockState {
    /// One entry is delivered per `bytes_to_read` call that finds the link idle
    pub incoming: VecDeque<io::Result<Vec<u8>>>,
    /// Every successful write, decoded
    pub writes: Vec<String>,
    /// Open failures keyed by port
    pub open_errors: HashMap<String, SessionError>,
    /// Successful opens
    pub opened: Vec<(String, LineConfig)>,
    /// Number of `close` calls on links
    pub closed: usize,
    pub fail_writes: bool,
    pub fail_close: bool,
    /// `None` makes enumeration fail
    pub ports: Option<Vec<PortDescriptor>>,
}

impl MockState {
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.push_back(Ok(bytes.to_vec()));
    }

    pub fn push_read_error(&mut self, kind: io::ErrorKind, message: &str) {
        self.incoming
            .push_back(Err(io::Error::new(kind, message.to_string())));
    }
}

pub type SharedState = Arc<Mutex<MockState>>;

pub struct MockTransport {
    state: SharedState,
}

impl MockTransport {
    /// Build a transport plus a handle for scripting it
    pub fn new() -> (Self, SharedState) {
        let state: SharedState = Arc::new(Mutex::new(MockState {
            ports: Some(Vec::new()),
            ..Default::default()
        }));
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

impl Transport for MockTransport {
    fn open(&self, port: &str, config: &LineConfig) -> commconsole_core::Result<Box<dyn SerialLink>> {
        let mut state = self.state.lock();
        if let Some(err) = state.open_errors.get(port) {
            return Err(err.clone());
        }
        state.opened.push((port.to_string(), *config));
        Ok(Box::new(MockLink {
            name: port.to_string(),
            state: self.state.clone(),
            pending: Vec::new(),
        }))
    }

    fn available_ports(&self) -> commconsole_core::Result<Vec<PortDescriptor>> {
        self.state
            .lock()
            .ports
            .clone()
            .ok_or_else(|| SessionError::TransportUnavailable {
                reason: "lister unavailable".to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub struct MockLink {
    name: String,
    state: SharedState,
    pending: Vec<u8>,
}

impl SerialLink for MockLink {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.state.lock().incoming.pop_front() {
                Some(Ok(bytes)) => self.pending = bytes,
                Some(Err(e)) => return Err(e),
                None => {}
            }
        }
        Ok(self.pending.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write rejected"));
        }
        state.writes.push(String::from_utf8_lossy(data).into_owned());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.closed += 1;
        if state.fail_close {
            return Err(io::Error::new(io::ErrorKind::Other, "close failed"));
        }
        Ok(())
    }
}
