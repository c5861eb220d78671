//! Shared fixtures for integration tests
//!
//! An in-process Modbus TCP device, connectors for failure scenarios and
//! helpers to drive the HTTP router without a socket.

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_modbus::prelude::*;
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};
use tower::ServiceExt;

use regsrv::api::create_routes;
use regsrv::bootstrap::{build_state, create_service_info};
use regsrv::config::RegsrvConfig;
use regsrv::storage::LogStore;
use regsrv::transport::{ConnectError, DeviceConnector, DeviceTarget, RegisterClient};

/// Registers exposed by the simulated device, in both banks
pub const REGISTER_COUNT: usize = 300;

type Bank = Arc<Mutex<Vec<u16>>>;

/// Per-connection service over shared register banks
struct DeviceService {
    holding: Bank,
    input: Bank,
}

fn read_bank(bank: &Bank, addr: u16, cnt: u16) -> Result<Vec<u16>, ExceptionCode> {
    let registers = bank.lock();
    let start = usize::from(addr);
    let end = start + usize::from(cnt);
    registers
        .get(start..end)
        .map(<[u16]>::to_vec)
        .ok_or(ExceptionCode::IllegalDataAddress)
}

fn write_bank(bank: &Bank, addr: u16, values: &[u16]) -> Result<(), ExceptionCode> {
    let mut registers = bank.lock();
    let start = usize::from(addr);
    let slot = registers
        .get_mut(start..start + values.len())
        .ok_or(ExceptionCode::IllegalDataAddress)?;
    slot.copy_from_slice(values);
    Ok(())
}

impl tokio_modbus::server::Service for DeviceService {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    fn call(&self, req: Self::Request) -> Self::Future {
        let res = match req {
            Request::ReadHoldingRegisters(addr, cnt) => {
                read_bank(&self.holding, addr, cnt).map(Response::ReadHoldingRegisters)
            },
            Request::ReadInputRegisters(addr, cnt) => {
                read_bank(&self.input, addr, cnt).map(Response::ReadInputRegisters)
            },
            Request::WriteSingleRegister(addr, value) => {
                write_bank(&self.holding, addr, std::slice::from_ref(&value))
                    .map(|_| Response::WriteSingleRegister(addr, value))
            },
            Request::WriteMultipleRegisters(addr, values) => {
                write_bank(&self.holding, addr, &values)
                    .map(|_| Response::WriteMultipleRegisters(addr, values.len() as u16))
            },
            _ => Err(ExceptionCode::IllegalFunction),
        };
        future::ready(res)
    }
}

/// Modbus TCP device listening on an ephemeral localhost port
pub struct SimulatedDevice {
    pub addr: SocketAddr,
    holding: Bank,
    input: Bank,
    handle: JoinHandle<()>,
}

impl SimulatedDevice {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let holding: Bank = Arc::new(Mutex::new(vec![0; REGISTER_COUNT]));
        let input: Bank = Arc::new(Mutex::new(vec![0; REGISTER_COUNT]));

        let server = Server::new(listener);
        let (h, i) = (holding.clone(), input.clone());
        let on_connected = move |stream, socket_addr| {
            let (holding, input) = (h.clone(), i.clone());
            async move {
                accept_tcp_connection(stream, socket_addr, move |_| {
                    Ok(Some(DeviceService {
                        holding: holding.clone(),
                        input: input.clone(),
                    }))
                })
            }
        };
        let on_process_error = |err| {
            eprintln!("Simulated device error: {}", err);
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve(&on_connected, on_process_error).await {
                eprintln!("Simulated device stopped: {}", e);
            }
        });

        Self {
            addr,
            holding,
            input,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn set_holding(&self, start: usize, values: &[u16]) {
        self.holding.lock()[start..start + values.len()].copy_from_slice(values);
    }

    pub fn set_input(&self, start: usize, values: &[u16]) {
        self.input.lock()[start..start + values.len()].copy_from_slice(values);
    }

    pub fn holding(&self, start: usize, count: usize) -> Vec<u16> {
        self.holding.lock()[start..start + count].to_vec()
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accepts connections and never answers a request
pub async fn start_silent_device() -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            open.push(stream);
        }
    });
    (addr, handle)
}

/// Port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Never completes the connect phase
pub struct HangingConnector;

#[async_trait]
impl DeviceConnector for HangingConnector {
    async fn connect(
        &self,
        _target: &DeviceTarget,
    ) -> Result<Box<dyn RegisterClient>, ConnectError> {
        future::pending().await
    }
}

/// Configuration pointing device defaults at `port` on localhost
pub fn test_config(port: u16) -> RegsrvConfig {
    let mut config = RegsrvConfig::default();
    config.device.default_host = "127.0.0.1".to_string();
    config.device.default_port = port;
    config.timeouts.connection_timeout_ms = 1_000;
    config.timeouts.exchange_timeout_ms = 300;
    config
}

pub fn build_app(
    config: &RegsrvConfig,
    store: Arc<dyn LogStore>,
    connector: Arc<dyn DeviceConnector>,
) -> Router {
    create_routes(build_state(config, store, connector, create_service_info()))
}

pub fn json_request(method: &str, uri: &str, body: Value) -> HttpRequest<Body> {
    HttpRequest::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> HttpRequest<Body> {
    HttpRequest::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Run one request through the router and decode the JSON body
pub async fn send(app: &Router, request: HttpRequest<Body>) -> (StatusCode, Value) {
    let response = tokio::time::timeout(Duration::from_secs(10), app.clone().oneshot(request))
        .await
        .expect("request timed out")
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
