//! Serial line configuration
//!
//! This module provides:
//! - Frame settings accepted by a UART connection (data bits, parity, stop bits)
//! - Flow control selection
//! - `LineConfig`, the full set of parameters handed to a transport on open
//!
//! Every enum parses from and displays as the labels a console front-end
//! offers in its selectors ("8", "Even", "1.5", "RTS/CTS", ...).

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baud rates offered by console front-ends
pub const STANDARD_BAUD_RATES: [u32; 8] = [
    9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    /// 7 data bits
    Seven,
    /// 8 data bits
    #[default]
    Eight,
}

impl DataBits {
    /// Number of bits as an integer
    pub fn bits(self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl FromStr for DataBits {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "7" | "seven" => Ok(Self::Seven),
            "8" | "eight" => Ok(Self::Eight),
            _ => Err(format!("Unsupported data bits: {}", s)),
        }
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Even => write!(f, "Even"),
            Self::Odd => write!(f, "Odd"),
        }
    }
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "even" | "e" => Ok(Self::Even),
            "odd" | "o" => Ok(Self::Odd),
            _ => Err(format!("Unknown parity: {}", s)),
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    /// 1 stop bit
    #[default]
    One,
    /// 1.5 stop bits
    OnePointFive,
    /// 2 stop bits
    Two,
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::OnePointFive => write!(f, "1.5"),
            Self::Two => write!(f, "2"),
        }
    }
}

impl FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "1.5" | "one_point_five" => Ok(Self::OnePointFive),
            "2" | "two" => Ok(Self::Two),
            _ => Err(format!("Unsupported stop bits: {}", s)),
        }
    }
}

/// Flow control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlowControl {
    /// No flow control
    #[default]
    None,
    /// Hardware flow control (RTS/CTS)
    RtsCts,
    /// Software flow control (XON/XOFF)
    XonXoff,
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::RtsCts => write!(f, "RTS/CTS"),
            Self::XonXoff => write!(f, "XON/XOFF"),
        }
    }
}

impl FromStr for FlowControl {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "rts/cts" | "rts_cts" | "rts-cts" | "hardware" => Ok(Self::RtsCts),
            "xon/xoff" | "xon_xoff" | "xon-xoff" | "software" => Ok(Self::XonXoff),
            _ => Err(format!("Unknown flow control: {}", s)),
        }
    }
}

/// Parameters for opening a serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfig {
    /// Baud rate (must be positive)
    pub baud_rate: u32,
    /// Data bits
    #[serde(default)]
    pub data_bits: DataBits,
    /// Parity
    #[serde(default)]
    pub parity: Parity,
    /// Stop bits
    #[serde(default)]
    pub stop_bits: StopBits,
    /// Flow control
    #[serde(default)]
    pub flow_control: FlowControl,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
        }
    }
}

impl LineConfig {
    /// Create a config with the given baud rate and 8N1 framing
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Set data bits
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set parity
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set stop bits
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set flow control
    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Check values a transport could never honour
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(SessionError::InvalidConfig {
                reason: "baud rate must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Even => 'E',
            Parity::Odd => 'O',
        };
        write!(
            f,
            "{} {}{}{} flow={}",
            self.baud_rate, self.data_bits, parity, self.stop_bits, self.flow_control
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_115200_8n1() {
        let config = LineConfig::default();
        assert_eq!(config.baud_rate, 115200);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.stop_bits, StopBits::One);
        assert_eq!(config.flow_control, FlowControl::None);
        assert_eq!(config.to_string(), "115200 8N1 flow=None");
    }

    #[test]
    fn test_parse_selector_labels() {
        assert_eq!("7".parse::<DataBits>().unwrap(), DataBits::Seven);
        assert_eq!("Even".parse::<Parity>().unwrap(), Parity::Even);
        assert_eq!("1.5".parse::<StopBits>().unwrap(), StopBits::OnePointFive);
        assert_eq!("RTS/CTS".parse::<FlowControl>().unwrap(), FlowControl::RtsCts);
        assert_eq!("xon/xoff".parse::<FlowControl>().unwrap(), FlowControl::XonXoff);
        assert!("6".parse::<DataBits>().is_err());
        assert!("mark".parse::<Parity>().is_err());
    }

    #[test]
    fn test_display_matches_labels() {
        assert_eq!(StopBits::OnePointFive.to_string(), "1.5");
        assert_eq!(FlowControl::XonXoff.to_string(), "XON/XOFF");
        assert_eq!(DataBits::Seven.to_string(), "7");
    }

    #[test]
    fn test_zero_baud_rejected() {
        let err = LineConfig::new(0).validate().unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfig { .. }));
        assert!(LineConfig::new(9600).validate().is_ok());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let config = LineConfig::new(9600)
            .with_stop_bits(StopBits::OnePointFive)
            .with_flow_control(FlowControl::RtsCts);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"one_point_five\""));
        assert!(json.contains("\"rts_cts\""));

        let partial: LineConfig = serde_json::from_str(r#"{"baud_rate": 57600}"#).unwrap();
        assert_eq!(partial, LineConfig::new(57600));
    }
}
