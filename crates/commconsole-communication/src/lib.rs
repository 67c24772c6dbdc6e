//! # CommConsole Communication
//!
//! Serial transport, port discovery, and session management for CommConsole.
//! The [`SessionManager`] mediates between a front-end and a [`Transport`],
//! keeping one text buffer per port and at most one open connection.

pub mod communication;
pub mod session;

pub use communication::{
    classify_open_error, default_transport,
    decoder::Utf8StreamDecoder,
    ports::{
        find_port_by_hardware_id, list_ports, usb_hardware_id, PortDescriptor,
        DEFAULT_HARDWARE_ID, PLACEHOLDER_PORT,
    },
    SerialLink, Transport, UnavailableTransport,
};

#[cfg(feature = "native")]
pub use communication::serial::{NativeLink, NativeTransport};

pub use session::{
    CompletionCallback, ConnectionState, ManagerConfig, SessionLog, SessionManager,
    DEFAULT_POLL_INTERVAL, DEFAULT_SEND_SPACING, MIN_SEND_SPACING,
};
