//! Device transport seam
//!
//! The executor only sees these traits. [`tcp::TcpConnector`] is the
//! production implementation; tests plug in scripted connectors.

pub mod tcp;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::classifier::DeviceFault;

pub use tcp::TcpConnector;

/// Where to connect and which unit to address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} (unit {})", self.host, self.port, self.unit_id)
    }
}

/// Socket-level failure while opening the connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// DNS failure, refused connection, unreachable network
    #[error("{0}")]
    Socket(String),
}

/// A live connection able to run the four register operations
#[async_trait]
pub trait RegisterClient: Send {
    async fn read_holding_registers(
        &mut self,
        start: u16,
        count: u16,
    ) -> Result<Vec<u16>, DeviceFault>;

    async fn read_input_registers(&mut self, start: u16, count: u16)
        -> Result<Vec<u16>, DeviceFault>;

    async fn write_single_register(&mut self, address: u16, value: u16)
        -> Result<(), DeviceFault>;

    async fn write_multiple_registers(
        &mut self,
        start: u16,
        values: &[u16],
    ) -> Result<(), DeviceFault>;

    /// Close the underlying connection; errors are logged, not returned
    async fn close(&mut self);
}

/// Opens one fresh connection per transaction
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn connect(&self, target: &DeviceTarget)
        -> Result<Box<dyn RegisterClient>, ConnectError>;
}
