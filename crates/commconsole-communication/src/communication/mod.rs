//! Transport capability
//!
//! The session manager never touches a serial driver directly. It drives a
//! [`Transport`], which opens [`SerialLink`]s and enumerates ports. The
//! native implementation adapts the `serialport` crate; builds without the
//! `native` feature get [`UnavailableTransport`], which reports every open as
//! `TransportUnavailable`.

pub mod decoder;
pub mod ports;
#[cfg(feature = "native")]
pub mod serial;

use commconsole_core::{LineConfig, Result, SessionError};
use std::io;

pub use decoder::Utf8StreamDecoder;
pub use ports::PortDescriptor;

/// An open serial connection
///
/// Reads must never block: callers check [`SerialLink::bytes_to_read`] first
/// and only read what is already waiting.
pub trait SerialLink: Send {
    /// Number of received bytes waiting in the driver buffer
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Read waiting data into `buf`, returning the byte count
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write the whole buffer
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush pending output
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Device name the link was opened on
    fn name(&self) -> &str;

    /// Release the device
    fn close(&mut self) -> io::Result<()>;
}

/// Factory for serial links plus port enumeration
pub trait Transport: Send {
    /// Open `port` with the given line settings
    ///
    /// Failures are already classified into `PortBusy`, `PortNotFound`,
    /// `OpenFailed`, `InvalidConfig` or `TransportUnavailable`.
    fn open(&self, port: &str, config: &LineConfig) -> Result<Box<dyn SerialLink>>;

    /// Enumerate ports visible to this transport
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Transport used when no serial driver is compiled in
#[derive(Debug, Clone, Default)]
pub struct UnavailableTransport {
    reason: String,
}

impl UnavailableTransport {
    /// Create with the reason reported to callers
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> SessionError {
        let reason = if self.reason.is_empty() {
            "no serial driver available".to_string()
        } else {
            self.reason.clone()
        };
        SessionError::TransportUnavailable { reason }
    }
}

impl Transport for UnavailableTransport {
    fn open(&self, _port: &str, _config: &LineConfig) -> Result<Box<dyn SerialLink>> {
        Err(self.error())
    }

    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        Err(self.error())
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// The transport this build was compiled with
pub fn default_transport() -> Box<dyn Transport> {
    #[cfg(feature = "native")]
    {
        Box::new(serial::NativeTransport::new())
    }

    #[cfg(not(feature = "native"))]
    {
        Box::new(UnavailableTransport::new(
            "compiled without the `native` serial feature",
        ))
    }
}

/// Map a failed open onto the error taxonomy
///
/// Drivers report busy and missing devices differently per platform, so both
/// the I/O error kind and the message text are inspected:
/// - permission denied, "access is denied", "busy" → `PortBusy`
/// - not found, "no such file", "cannot find the file" → `PortNotFound`
/// - anything else → `OpenFailed`
pub fn classify_open_error(port: &str, kind: Option<io::ErrorKind>, message: &str) -> SessionError {
    let lower = message.to_lowercase();
    let port = port.to_string();
    let detail = message.to_string();

    let busy_kind = matches!(
        kind,
        Some(io::ErrorKind::PermissionDenied) | Some(io::ErrorKind::ResourceBusy)
    );
    if busy_kind
        || lower.contains("access is denied")
        || lower.contains("permission denied")
        || lower.contains("busy")
    {
        return SessionError::PortBusy { port, detail };
    }

    if kind == Some(io::ErrorKind::NotFound)
        || lower.contains("no such file")
        || lower.contains("cannot find the file")
        || lower.contains("not found")
    {
        return SessionError::PortNotFound { port, detail };
    }

    SessionError::OpenFailed { port, detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_kind() {
        let err = classify_open_error("COM3", Some(io::ErrorKind::PermissionDenied), "os error 5");
        assert!(matches!(err, SessionError::PortBusy { .. }));

        let err = classify_open_error(
            "/dev/ttyUSB0",
            Some(io::ErrorKind::NotFound),
            "os error 2",
        );
        assert!(matches!(err, SessionError::PortNotFound { .. }));
    }

    #[test]
    fn test_classify_by_message() {
        let err = classify_open_error("COM3", None, "Access is denied.");
        assert!(matches!(err, SessionError::PortBusy { .. }));

        let err = classify_open_error("/dev/ttyUSB0", None, "Device or resource busy");
        assert!(matches!(err, SessionError::PortBusy { .. }));

        let err = classify_open_error("COM9", None, "The system cannot find the file specified.");
        assert!(matches!(err, SessionError::PortNotFound { .. }));

        let err = classify_open_error("/dev/ttyACM1", None, "No such file or directory");
        assert!(matches!(err, SessionError::PortNotFound { .. }));
    }

    #[test]
    fn test_classify_fallback_keeps_detail() {
        let err = classify_open_error("COM3", None, "The parameter is incorrect.");
        assert_eq!(
            err,
            SessionError::OpenFailed {
                port: "COM3".to_string(),
                detail: "The parameter is incorrect.".to_string(),
            }
        );
    }

    #[test]
    fn test_unavailable_transport() {
        let transport = UnavailableTransport::new("driver missing");
        let err = transport
            .open("COM1", &LineConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::TransportUnavailable { .. }));
        assert!(transport.available_ports().is_err());
    }
}
