//! # CommConsole
//!
//! A serial (UART) communication console with one text buffer per port.
//!
//! ## Architecture
//!
//! CommConsole is organized as a workspace with multiple crates:
//!
//! 1. **commconsole-core** - Line settings, errors, events, sequence reports
//! 2. **commconsole-communication** - Transports, port discovery, session manager
//! 3. **commconsole-settings** - Configuration files
//! 4. **commconsole** - Headless console binary that drives the manager

pub mod console;

pub use commconsole_core::{
    DataBits, EventDispatcher, FlowControl, LineConfig, Parity, Result, SequenceId,
    SequenceReport, SessionError, SessionEvent, StopBits,
};

pub use commconsole_communication::{
    default_transport, find_port_by_hardware_id, list_ports, ConnectionState, ManagerConfig,
    PortDescriptor, SessionManager, Transport, UnavailableTransport, DEFAULT_HARDWARE_ID,
};

pub use commconsole_settings::{ConsoleConfig, SettingsError};

pub use console::{spawn_line_reader, ConsoleCommand};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Sets up structured logging with:
/// - `RUST_LOG` support, falling back to `level`
/// - Pretty or JSON formatting
/// - Output on stderr, leaving stdout to device data
pub fn init_logging(level: &str, json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true);
        registry.with(fmt_layer).try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_names(true)
            .with_line_number(true);
        registry.with(fmt_layer).try_init()?;
    }

    Ok(())
}
