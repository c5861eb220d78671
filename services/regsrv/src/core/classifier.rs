//! Error classification
//!
//! [`DeviceFault`] is the closed set of failures a register exchange can
//! produce. Transports build it directly; [`classify`] renders the stable
//! operator-facing message.

use std::io;

use thiserror::Error;

/// Failure of the register exchange, after the connection was established
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    /// Response did not match the expected transaction id
    #[error("Synchronization error: {0}")]
    OutOfSync(String),

    /// Malformed PDU or unexpected function code in the response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No response within the exchange timeout
    #[error("Modbus operation timed out: {0}")]
    Timeout(String),

    /// Operation cancelled by the caller
    #[error("Operation cancelled: {0}")]
    ManuallyCleared(String),

    /// Device answered with an exception code
    #[error("Modbus exception: {0}")]
    ModbusException(String),

    /// Device unreachable at the protocol layer
    #[error("Device offline: {0}")]
    Offline(String),

    /// Frame checksum validation failed
    #[error("CRC error: {0}")]
    CrcMismatch(String),

    /// Failure inside the client implementation itself
    #[error("Internal error: {0}")]
    InternalException(String),

    #[error("Unknown error: {}", .0.as_deref().unwrap_or("No details available"))]
    Unknown(Option<String>),
}

impl DeviceFault {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfSync(_) => "OUT_OF_SYNC",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Timeout(_) => "EXCHANGE_TIMEOUT",
            Self::ManuallyCleared(_) => "MANUALLY_CLEARED",
            Self::ModbusException(_) => "MODBUS_EXCEPTION",
            Self::Offline(_) => "DEVICE_OFFLINE",
            Self::CrcMismatch(_) => "CRC_MISMATCH",
            Self::InternalException(_) => "INTERNAL_EXCEPTION",
            Self::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Build an `Unknown` fault, keeping the text only when there is some
    pub fn unknown(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if detail.trim().is_empty() {
            Self::Unknown(None)
        } else {
            Self::Unknown(Some(detail))
        }
    }
}

/// Stable human-readable message for a fault
pub fn classify(fault: &DeviceFault) -> String {
    fault.to_string()
}

/// Map an I/O error seen during the exchange onto the fault taxonomy
pub fn fault_from_io(err: &io::Error) -> DeviceFault {
    let detail = err.to_string();
    match err.kind() {
        io::ErrorKind::TimedOut => DeviceFault::Timeout(detail),
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::NotConnected => DeviceFault::Offline(detail),
        io::ErrorKind::InvalidData => DeviceFault::Protocol(detail),
        io::ErrorKind::InvalidInput => DeviceFault::InternalException(detail),
        io::ErrorKind::Interrupted => DeviceFault::ManuallyCleared(detail),
        _ => DeviceFault::unknown(detail),
    }
}
