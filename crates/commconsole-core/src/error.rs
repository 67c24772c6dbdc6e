//! Error handling for CommConsole
//!
//! Provides the error taxonomy for every session and transport operation:
//! - Open errors (driver missing, port busy, port missing)
//! - Runtime errors (connection lost while polling, write failures)
//! - Configuration errors
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Session error type
///
/// Every failure path of the session manager maps to exactly one variant and
/// leaves the manager either disconnected or connected with buffers intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A connection is already open
    #[error("Already connected to {port}")]
    AlreadyConnected {
        /// The port the live connection is bound to.
        port: String,
    },

    /// The serial driver could not be acquired
    #[error("Serial transport unavailable: {reason}")]
    TransportUnavailable {
        /// Why the transport is unavailable.
        reason: String,
    },

    /// The port is held by another process or access was denied
    #[error("Port {port} is busy or access is denied: {detail}")]
    PortBusy {
        /// The port that could not be opened.
        port: String,
        /// The transport's own error text.
        detail: String,
    },

    /// The port does not exist
    #[error("Port {port} was not found: {detail}")]
    PortNotFound {
        /// The port that could not be opened.
        port: String,
        /// The transport's own error text.
        detail: String,
    },

    /// The port could not be opened for a reason that is neither busy nor missing
    #[error("Failed to open port {port}: {detail}")]
    OpenFailed {
        /// The port that could not be opened.
        port: String,
        /// The transport's own error text.
        detail: String,
    },

    /// The line configuration cannot be honoured
    #[error("Invalid line configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The connection failed while reading
    #[error("Connection to {port} lost: {detail}")]
    ConnectionLost {
        /// The port the connection was bound to.
        port: String,
        /// The read error reported by the transport.
        detail: String,
    },

    /// A write to the connection failed
    #[error("Send to {port} failed: {detail}")]
    SendFailed {
        /// The port the write was addressed to.
        port: String,
        /// The write error reported by the transport.
        detail: String,
    },
}

impl SessionError {
    /// Check if this error came from an open attempt
    pub fn is_open_error(&self) -> bool {
        matches!(
            self,
            SessionError::TransportUnavailable { .. }
                | SessionError::PortBusy { .. }
                | SessionError::PortNotFound { .. }
                | SessionError::OpenFailed { .. }
                | SessionError::InvalidConfig { .. }
        )
    }

    /// Check if the user can retry after fixing their environment
    ///
    /// A missing driver is reported once and never worth retrying.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SessionError::TransportUnavailable { .. })
    }

    /// Check if the connection was torn down by this error
    pub fn is_disconnect(&self) -> bool {
        matches!(self, SessionError::ConnectionLost { .. })
    }

    /// Message suitable for a dialog or status line
    pub fn user_message(&self) -> String {
        match self {
            SessionError::AlreadyConnected { port } => {
                format!("Already connected to {}. Disconnect first.", port)
            }
            SessionError::TransportUnavailable { reason } => format!(
                "Serial support is not available in this build.\n\nDetails: {}",
                reason
            ),
            SessionError::PortBusy { port, detail } => format!(
                "Port {} is busy or access is denied. Close other apps and try again.\n\nDetails: {}",
                port, detail
            ),
            SessionError::PortNotFound { port, detail } => format!(
                "Port {} was not found. Check the device and try again.\n\nDetails: {}",
                port, detail
            ),
            SessionError::OpenFailed { detail, .. } => detail.clone(),
            SessionError::InvalidConfig { reason } => reason.clone(),
            SessionError::ConnectionLost { detail, .. } => format!(
                "Serial port error: {}\nThe connection has been closed.",
                detail
            ),
            SessionError::SendFailed { detail, .. } => detail.clone(),
        }
    }
}

/// Result type using SessionError
pub type Result<T> = std::result::Result<T, SessionError>;
