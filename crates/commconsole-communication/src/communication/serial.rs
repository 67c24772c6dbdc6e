//! Native serial port transport
//!
//! Adapts the `serialport` crate to the [`Transport`] capability:
//! - Port enumeration with hardware ids
//! - Baud rate, data bits, parity, stop bits and flow control
//! - Zero-timeout reads so polling never blocks
//! - Open error classification (busy vs. missing device)

use super::ports::{usb_hardware_id, PortDescriptor, UNKNOWN_HARDWARE_ID};
use super::{classify_open_error, SerialLink, Transport};
use commconsole_core::{DataBits, FlowControl, LineConfig, Parity, Result, SessionError, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Transport backed by the operating system's serial driver
///
/// `serialport` has no 1.5 stop bit setting, so opening with
/// [`StopBits::OnePointFive`] fails with `InvalidConfig` before the device
/// is touched.
#[derive(Debug, Clone, Default)]
pub struct NativeTransport;

impl NativeTransport {
    /// Create a new native transport
    pub fn new() -> Self {
        Self
    }
}

fn to_serialport_data_bits(data_bits: DataBits) -> serialport::DataBits {
    match data_bits {
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn to_serialport_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn to_serialport_stop_bits(stop_bits: StopBits) -> Result<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(SessionError::InvalidConfig {
            reason: "1.5 stop bits are not supported by the native serial driver".to_string(),
        }),
    }
}

fn to_serialport_flow_control(flow_control: FlowControl) -> serialport::FlowControl {
    match flow_control {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::RtsCts => serialport::FlowControl::Hardware,
        FlowControl::XonXoff => serialport::FlowControl::Software,
    }
}

fn classify_serialport_error(port: &str, e: &serialport::Error) -> SessionError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => SessionError::PortNotFound {
            port: port.to_string(),
            detail: e.description.clone(),
        },
        serialport::ErrorKind::InvalidInput => SessionError::InvalidConfig {
            reason: e.description.clone(),
        },
        serialport::ErrorKind::Io(kind) => classify_open_error(port, Some(kind), &e.description),
        serialport::ErrorKind::Unknown => classify_open_error(port, None, &e.description),
    }
}

fn hardware_id(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(usb_info) => usb_hardware_id(
            usb_info.vid,
            usb_info.pid,
            usb_info.serial_number.as_deref(),
        ),
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "BLUETOOTH".to_string(),
        serialport::SerialPortType::Unknown => UNKNOWN_HARDWARE_ID.to_string(),
    }
}

impl Transport for NativeTransport {
    fn open(&self, port: &str, config: &LineConfig) -> Result<Box<dyn SerialLink>> {
        config.validate()?;

        let builder = serialport::new(port, config.baud_rate)
            .timeout(Duration::ZERO)
            .data_bits(to_serialport_data_bits(config.data_bits))
            .parity(to_serialport_parity(config.parity))
            .stop_bits(to_serialport_stop_bits(config.stop_bits)?)
            .flow_control(to_serialport_flow_control(config.flow_control));

        match builder.open() {
            Ok(handle) => {
                tracing::info!("Opened serial port {} ({})", port, config);
                Ok(Box::new(NativeLink {
                    name: port.to_string(),
                    port: Some(handle),
                }))
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", port, e);
                Err(classify_serialport_error(port, &e))
            }
        }
    }

    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        serialport::available_ports()
            .map(|ports| {
                ports
                    .iter()
                    .map(|port| PortDescriptor::new(&port.port_name, hardware_id(&port.port_type)))
                    .collect()
            })
            .map_err(|e| SessionError::TransportUnavailable {
                reason: format!("Failed to enumerate ports: {}", e),
            })
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// Open serial port handle
pub struct NativeLink {
    name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl NativeLink {
    fn handle(&mut self) -> io::Result<&mut Box<dyn serialport::SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, format!("{} is closed", self.name))
        })
    }
}

impl SerialLink for NativeLink {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let waiting = self.handle()?.bytes_to_read().map_err(io::Error::from)?;
        Ok(waiting as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.handle()?.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.handle()?.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle()?.flush()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the handle releases the device
        match self.port.take() {
            Some(mut port) => port.flush(),
            None => Ok(()),
        }
    }
}
