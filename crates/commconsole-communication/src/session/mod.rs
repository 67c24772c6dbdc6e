//! Per-port sessions and the manager that owns them

pub mod log;
pub mod manager;
pub mod sequence;

pub use log::SessionLog;
pub use manager::{
    ConnectionState, ManagerConfig, SessionManager, DEFAULT_POLL_INTERVAL, DEFAULT_SEND_SPACING,
    MIN_SEND_SPACING,
};
pub use sequence::CompletionCallback;
