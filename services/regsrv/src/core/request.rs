//! Request and result model for a single register transaction

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::dispatcher::DispatchError;

/// Modbus function selected by name on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionCode {
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleRegister,
    WriteMultipleRegisters,
}

impl FunctionCode {
    pub const ALL: [FunctionCode; 4] = [
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleRegister,
        Self::WriteMultipleRegisters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadHoldingRegisters => "readHoldingRegisters",
            Self::ReadInputRegisters => "readInputRegisters",
            Self::WriteSingleRegister => "writeSingleRegister",
            Self::WriteMultipleRegisters => "writeMultipleRegisters",
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Self::ReadHoldingRegisters | Self::ReadInputRegisters
        )
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionCode {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fc| fc.as_str() == s)
            .ok_or_else(|| DispatchError::UnsupportedFunction(s.to_string()))
    }
}

/// One transaction as received at the API boundary
///
/// `start_address` is already zero-based. `length` keeps its wire meaning:
/// register count for reads and FC16, the register value for FC06.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub function_type: String,
    pub start_address: i64,
    pub length: i64,
    pub write_data: Option<String>,
}

/// Validated protocol operation, ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOperation {
    ReadHolding { start: u16, count: u16 },
    ReadInput { start: u16, count: u16 },
    WriteSingle { address: u16, value: u16 },
    WriteMultiple { start: u16, values: Vec<u16> },
}

/// Raw result of a register operation, passed through unmodified
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterResponse {
    /// Decoded register values (empty for writes)
    pub values: Vec<u16>,
    /// Register payload bytes in wire order, reads only
    pub raw: Option<Vec<u8>>,
}

impl RegisterResponse {
    pub fn from_registers(values: Vec<u16>) -> Self {
        let raw = common::hex::registers_to_be_bytes(&values);
        Self {
            values,
            raw: Some(raw),
        }
    }

    pub fn write_ack() -> Self {
        Self::default()
    }

    /// Lowercase hex of the raw payload, if any
    pub fn raw_hex(&self) -> Option<String> {
        self.raw.as_deref().map(common::hex::encode_lower)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_function_code_names_round_trip() {
        for fc in FunctionCode::ALL {
            assert_eq!(fc.as_str().parse::<FunctionCode>().unwrap(), fc);
        }
    }

    #[test]
    fn test_unknown_function_name() {
        let err = "readCoils".parse::<FunctionCode>().unwrap_err();
        assert_eq!(err, DispatchError::UnsupportedFunction("readCoils".into()));
    }

    #[test]
    fn test_read_response_hex() {
        let resp = RegisterResponse::from_registers(vec![0x1234, 0x00ff]);
        assert_eq!(resp.raw_hex().as_deref(), Some("123400ff"));
        assert_eq!(RegisterResponse::write_ack().raw_hex(), None);
    }
}
