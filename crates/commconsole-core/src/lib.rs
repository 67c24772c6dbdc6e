//! # CommConsole Core
//!
//! Core types, errors, and events for CommConsole.
//! Provides the serial line configuration model, the session error taxonomy,
//! and the event channel front-ends subscribe to.

pub mod data;
pub mod error;
pub mod event;
pub mod sequence;

pub use data::{
    DataBits, FlowControl, LineConfig, Parity, StopBits, DEFAULT_BAUD_RATE, STANDARD_BAUD_RATES,
};

pub use error::{Result, SessionError};

pub use event::{EventDispatcher, SessionEvent};

pub use sequence::{SequenceId, SequenceReport};
