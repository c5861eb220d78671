//! Function dispatch
//!
//! Turns a function name plus raw numeric fields into a validated
//! [`RegisterOperation`] and runs it against a connected client. All
//! validation happens in [`plan`], before any socket I/O.

use thiserror::Error;

use super::classifier::DeviceFault;
use super::request::{FunctionCode, RegisterOperation, RegisterResponse};
use crate::transport::RegisterClient;

/// Lowest value accepted for a register write (signed 16-bit)
pub const MIN_REGISTER_VALUE: i64 = i16::MIN as i64;
/// Highest value accepted for a register write (unsigned 16-bit)
pub const MAX_REGISTER_VALUE: i64 = u16::MAX as i64;

/// Operation-specific input errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unsupported Modbus function: {0}")]
    UnsupportedFunction(String),

    #[error("Register value exceeds 16 bits: {0}")]
    ValueOutOfRange(i64),

    #[error("Missing write data for writeMultipleRegisters")]
    MissingWriteData,

    #[error("Invalid write data value: '{0}'")]
    InvalidWriteData(String),

    #[error("Number of registers ({actual}) does not match 'length' ({expected})")]
    CountMismatch { expected: i64, actual: usize },

    #[error("Write value {0} is outside -32768..65535")]
    WriteValueOutOfRange(i64),

    #[error("Length {0} is out of range")]
    LengthOutOfRange(i64),

    #[error("Start address {0} is out of range")]
    AddressOutOfRange(i64),
}

impl DispatchError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFunction(_) => "UNSUPPORTED_FUNCTION",
            Self::ValueOutOfRange(_) => "VALUE_OUT_OF_RANGE",
            Self::MissingWriteData => "MISSING_WRITE_DATA",
            Self::InvalidWriteData(_) => "INVALID_WRITE_DATA",
            Self::CountMismatch { .. } => "COUNT_MISMATCH",
            Self::WriteValueOutOfRange(_) => "WRITE_VALUE_OUT_OF_RANGE",
            Self::LengthOutOfRange(_) => "LENGTH_OUT_OF_RANGE",
            Self::AddressOutOfRange(_) => "ADDRESS_OUT_OF_RANGE",
        }
    }
}

/// Validate a request's fields and build the operation to send
pub fn plan(
    function_type: &str,
    start_address: i64,
    length: i64,
    write_data: Option<&str>,
) -> Result<RegisterOperation, DispatchError> {
    let function = function_type.parse::<FunctionCode>()?;
    let start = u16::try_from(start_address)
        .map_err(|_| DispatchError::AddressOutOfRange(start_address))?;

    let op = match function {
        FunctionCode::ReadHoldingRegisters => RegisterOperation::ReadHolding {
            start,
            count: read_count(length)?,
        },
        FunctionCode::ReadInputRegisters => RegisterOperation::ReadInput {
            start,
            count: read_count(length)?,
        },
        FunctionCode::WriteSingleRegister => {
            // `length` carries the value for FC06
            if length > MAX_REGISTER_VALUE || length < MIN_REGISTER_VALUE {
                return Err(DispatchError::ValueOutOfRange(length));
            }
            RegisterOperation::WriteSingle {
                address: start,
                value: to_register(length),
            }
        },
        FunctionCode::WriteMultipleRegisters => {
            let data = write_data
                .filter(|d| !d.trim().is_empty())
                .ok_or(DispatchError::MissingWriteData)?;
            RegisterOperation::WriteMultiple {
                start,
                values: parse_write_data(data, length)?,
            }
        },
    };

    Ok(op)
}

fn read_count(length: i64) -> Result<u16, DispatchError> {
    u16::try_from(length).map_err(|_| DispatchError::LengthOutOfRange(length))
}

/// Two's complement for negative values, identity otherwise
fn to_register(value: i64) -> u16 {
    if value < 0 {
        value as i16 as u16
    } else {
        value as u16
    }
}

/// Parse a comma-separated FC16 payload whose element count must equal `expected`
pub fn parse_write_data(data: &str, expected: i64) -> Result<Vec<u16>, DispatchError> {
    let tokens: Vec<&str> = data.split(',').map(str::trim).collect();

    if i64::try_from(tokens.len()).ok() != Some(expected) {
        return Err(DispatchError::CountMismatch {
            expected,
            actual: tokens.len(),
        });
    }

    tokens
        .into_iter()
        .map(|token| {
            let value = token
                .parse::<i64>()
                .map_err(|_| DispatchError::InvalidWriteData(token.to_string()))?;
            if !(MIN_REGISTER_VALUE..=MAX_REGISTER_VALUE).contains(&value) {
                return Err(DispatchError::WriteValueOutOfRange(value));
            }
            Ok(to_register(value))
        })
        .collect()
}

/// Run exactly one operation on a connected client
pub async fn dispatch(
    client: &mut dyn RegisterClient,
    op: &RegisterOperation,
) -> Result<RegisterResponse, DeviceFault> {
    match op {
        RegisterOperation::ReadHolding { start, count } => client
            .read_holding_registers(*start, *count)
            .await
            .map(RegisterResponse::from_registers),
        RegisterOperation::ReadInput { start, count } => client
            .read_input_registers(*start, *count)
            .await
            .map(RegisterResponse::from_registers),
        RegisterOperation::WriteSingle { address, value } => {
            client.write_single_register(*address, *value).await?;
            Ok(RegisterResponse::write_ack())
        },
        RegisterOperation::WriteMultiple { start, values } => {
            client.write_multiple_registers(*start, values).await?;
            Ok(RegisterResponse::write_ack())
        },
    }
}
