//! Modbus TCP transport on top of tokio-modbus

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_modbus::client::{Context as ModbusContext, Reader, Writer};
use tokio_modbus::prelude::*;
use tokio_modbus::{Error as TokioModbusError, ProtocolError};
use tracing::{debug, warn};

use super::{ConnectError, DeviceConnector, DeviceTarget, RegisterClient};
use crate::core::classifier::{fault_from_io, DeviceFault};

/// Connects with a plain TCP socket and attaches a Modbus client to it
#[derive(Debug, Clone)]
pub struct TcpConnector {
    exchange_timeout: Duration,
}

impl TcpConnector {
    pub fn new(exchange_timeout: Duration) -> Self {
        Self { exchange_timeout }
    }
}

#[async_trait]
impl DeviceConnector for TcpConnector {
    async fn connect(
        &self,
        target: &DeviceTarget,
    ) -> Result<Box<dyn RegisterClient>, ConnectError> {
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(|e| ConnectError::Socket(e.to_string()))?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY on {}: {}", target, e);
        }

        let ctx = tokio_modbus::client::tcp::attach_slave(stream, Slave(target.unit_id));
        debug!("Modbus TCP client attached to {}", target);

        Ok(Box::new(TcpRegisterClient {
            ctx,
            exchange_timeout: self.exchange_timeout,
        }))
    }
}

/// One attached Modbus context, used for a single operation
struct TcpRegisterClient {
    ctx: ModbusContext,
    exchange_timeout: Duration,
}

/// Map a tokio-modbus error onto the fault taxonomy
fn map_modbus_error(error: TokioModbusError) -> DeviceFault {
    match error {
        TokioModbusError::Transport(io_error) => fault_from_io(&io_error),
        TokioModbusError::Protocol(protocol_error) => {
            let detail = protocol_error.to_string();
            match protocol_error {
                ProtocolError::HeaderMismatch { .. } => DeviceFault::OutOfSync(detail),
                _ => DeviceFault::Protocol(detail),
            }
        },
    }
}

#[async_trait]
impl RegisterClient for TcpRegisterClient {
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceFault> {
        let exchange_timeout = self.exchange_timeout;
        let call = self.ctx.read_holding_registers(start, count);
        guarded_call(exchange_timeout, call).await
    }

    async fn read_input_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceFault> {
        let exchange_timeout = self.exchange_timeout;
        let call = self.ctx.read_input_registers(start, count);
        guarded_call(exchange_timeout, call).await
    }

    async fn write_single_register(
        &mut self,
        address: u16,
        value: u16,
    ) -> Result<(), DeviceFault> {
        let exchange_timeout = self.exchange_timeout;
        let call = self.ctx.write_single_register(address, value);
        guarded_call(exchange_timeout, call).await
    }

    async fn write_multiple_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> Result<(), DeviceFault> {
        let exchange_timeout = self.exchange_timeout;
        let call = self.ctx.write_multiple_registers(start, values);
        guarded_call(exchange_timeout, call).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.ctx.disconnect().await {
            warn!("Error disconnecting Modbus TCP client: {}", e);
        }
    }
}

/// Apply the exchange timeout and flatten the three result layers
async fn guarded_call<T, F>(exchange_timeout: Duration, call: F) -> Result<T, DeviceFault>
where
    F: std::future::Future<Output = tokio_modbus::Result<T>>,
{
    match timeout(exchange_timeout, call).await {
        Err(_) => Err(DeviceFault::Timeout(format!(
            "no response within {} ms",
            exchange_timeout.as_millis()
        ))),
        Ok(Err(e)) => Err(map_modbus_error(e)),
        Ok(Ok(Err(exception))) => Err(DeviceFault::ModbusException(format!("{:?}", exception))),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}
