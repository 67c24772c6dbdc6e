//! Port discovery
//!
//! Enumeration never fails from the caller's point of view: when the driver
//! cannot list ports (or lists none) a single placeholder entry is returned so
//! a port selector always has something to show.

use super::Transport;
use serde::{Deserialize, Serialize};

/// USB identifier of the default SoC serial bridge
pub const DEFAULT_HARDWARE_ID: &str = "VID:PID=067B:23A3";

/// Hardware id reported for ports with no bus information
pub const UNKNOWN_HARDWARE_ID: &str = "n/a";

/// Placeholder device offered when enumeration yields nothing
#[cfg(windows)]
pub const PLACEHOLDER_PORT: &str = "COM1";
/// Placeholder device offered when enumeration yields nothing
#[cfg(not(windows))]
pub const PLACEHOLDER_PORT: &str = "/dev/ttyS0";

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Device name (e.g., "/dev/ttyUSB0", "COM3")
    pub device_name: String,

    /// Hardware id (e.g., "USB VID:PID=067B:23A3 SER=123")
    pub hardware_id: String,
}

impl PortDescriptor {
    /// Create a new port descriptor
    pub fn new(device_name: impl Into<String>, hardware_id: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            hardware_id: hardware_id.into(),
        }
    }

    /// The synthetic entry returned when enumeration fails
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_PORT, UNKNOWN_HARDWARE_ID)
    }
}

/// Format a USB hardware id the way serial tooling conventionally prints it
pub fn usb_hardware_id(vid: u16, pid: u16, serial_number: Option<&str>) -> String {
    match serial_number {
        Some(serial) if !serial.is_empty() => {
            format!("USB VID:PID={:04X}:{:04X} SER={}", vid, pid, serial)
        }
        _ => format!("USB VID:PID={:04X}:{:04X}", vid, pid),
    }
}

/// List ports visible to `transport`, sorted by device name
///
/// Returns a single placeholder entry instead of an error or an empty list.
pub fn list_ports(transport: &dyn Transport) -> Vec<PortDescriptor> {
    match transport.available_ports() {
        Ok(mut ports) if !ports.is_empty() => {
            ports.sort_by(|a, b| a.device_name.cmp(&b.device_name));
            ports
        }
        Ok(_) => {
            tracing::debug!("No serial ports found, offering {}", PLACEHOLDER_PORT);
            vec![PortDescriptor::placeholder()]
        }
        Err(e) => {
            tracing::warn!("Failed to enumerate serial ports: {}", e);
            vec![PortDescriptor::placeholder()]
        }
    }
}

/// Numeric suffix of a device name ("COM12" → 12, "/dev/ttyUSB0" → 0)
fn trailing_number(device_name: &str) -> Option<u64> {
    let stem = device_name.trim_end_matches(|c: char| c.is_ascii_digit());
    device_name[stem.len()..].parse().ok()
}

/// Find the device whose hardware id contains `needle`
///
/// When several ports match, the one with the smallest trailing number wins
/// (COM3 before COM10); names without a number sort last and list order breaks
/// ties. An empty needle matches nothing.
pub fn find_port_by_hardware_id(ports: &[PortDescriptor], needle: &str) -> Option<String> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }

    ports
        .iter()
        .enumerate()
        .filter(|(_, port)| port.hardware_id.contains(needle))
        .min_by_key(|(index, port)| (trailing_number(&port.device_name).unwrap_or(u64::MAX), *index))
        .map(|(_, port)| port.device_name.clone())
}
