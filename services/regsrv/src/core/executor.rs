//! Transaction Executor
//!
//! Runs one request end to end: validate, connect under a timer, dispatch
//! a single operation, close, record. The lifecycle is an explicit state
//! machine:
//!
//! ```text
//! Connecting ──connected──▶ Executing ──ok──▶ Completed
//!     │                        │
//!     └──timeout / socket──────┴──fault──▶ Failed
//! ```
//!
//! The connection is owned by `execute` and closed before entering either
//! terminal state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::classifier::DeviceFault;
use super::dispatcher::{self, DispatchError};
use super::recorder::OutcomeRecorder;
use super::request::{RegisterResponse, TransactionRequest};
use crate::storage::LogEntry;
use crate::transport::{ConnectError, DeviceConnector, DeviceTarget};

/// Executor settings, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Guards the connect phase only
    pub connection_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Lifecycle of a single transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Connecting,
    Executing,
    Completed,
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn can_advance_to(&self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Executing)
                | (Self::Connecting, Self::Failed)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Failed)
        )
    }
}

/// Why a transaction that reached the transport failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionFailure {
    #[error("Connection timeout")]
    ConnectTimeout,

    #[error("Connection error: {0}")]
    Socket(String),

    #[error(transparent)]
    Device(#[from] DeviceFault),
}

/// Phase timings in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetrics {
    pub connect_ms: u64,
    pub transfer_ms: u64,
    pub total_ms: u64,
}

/// Final, immutable result of one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    /// Elapsed time up to completion or failure
    pub elapsed_ms: u64,
    pub result: Result<RegisterResponse, TransactionFailure>,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything the caller gets back from [`TransactionExecutor::execute`]
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: TransactionOutcome,
    pub metrics: TransactionMetrics,
    /// `None` when persistence failed
    pub log_entry: Option<LogEntry>,
}

/// Tracks state transitions and timing for one transaction
struct Transaction {
    state: TransactionState,
    started: Instant,
    metrics: TransactionMetrics,
}

impl Transaction {
    fn begin() -> Self {
        Self {
            state: TransactionState::Connecting,
            started: Instant::now(),
            metrics: TransactionMetrics::default(),
        }
    }

    fn advance(&mut self, next: TransactionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Transaction state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn finish(
        mut self,
        result: Result<RegisterResponse, TransactionFailure>,
    ) -> (TransactionOutcome, TransactionMetrics) {
        self.advance(if result.is_ok() {
            TransactionState::Completed
        } else {
            TransactionState::Failed
        });
        let elapsed_ms = self.elapsed_ms();
        self.metrics.total_ms = elapsed_ms;
        (TransactionOutcome { elapsed_ms, result }, self.metrics)
    }
}

/// Executes register transactions against devices
pub struct TransactionExecutor {
    connector: Arc<dyn DeviceConnector>,
    recorder: OutcomeRecorder,
    config: ExecutorConfig,
}

impl TransactionExecutor {
    pub fn new(
        connector: Arc<dyn DeviceConnector>,
        recorder: OutcomeRecorder,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            connector,
            recorder,
            config,
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn recorder(&self) -> &OutcomeRecorder {
        &self.recorder
    }

    /// Run one transaction
    ///
    /// Input errors return `Err` before any I/O and are not recorded. Every
    /// other path, success or failure, is recorded exactly once.
    pub async fn execute(
        &self,
        request: &TransactionRequest,
    ) -> Result<ExecutionReport, DispatchError> {
        let op = dispatcher::plan(
            &request.function_type,
            request.start_address,
            request.length,
            request.write_data.as_deref(),
        )?;

        let target = DeviceTarget {
            host: request.host.clone(),
            port: request.port,
            unit_id: request.unit_id,
        };

        let mut txn = Transaction::begin();
        debug!("Connecting to {} for {}", target, request.function_type);

        let connected =
            tokio::time::timeout(self.config.connection_timeout, self.connector.connect(&target))
                .await;

        let result = match connected {
            Err(_) => Err(TransactionFailure::ConnectTimeout),
            Ok(Err(ConnectError::Socket(msg))) => Err(TransactionFailure::Socket(msg)),
            Ok(Ok(mut client)) => {
                txn.metrics.connect_ms = txn.elapsed_ms();
                txn.advance(TransactionState::Executing);

                let transfer_start = Instant::now();
                let dispatched = dispatcher::dispatch(client.as_mut(), &op).await;
                txn.metrics.transfer_ms = transfer_start.elapsed().as_millis() as u64;

                client.close().await;
                dispatched.map_err(TransactionFailure::from)
            },
        };

        let (outcome, metrics) = txn.finish(result);

        match &outcome.result {
            Ok(response) => info!(
                "{} {} start={} len={} ok ({} values, {} ms)",
                target,
                request.function_type,
                request.start_address,
                request.length,
                response.values.len(),
                outcome.elapsed_ms
            ),
            Err(failure) => warn!(
                "{} {} start={} len={} failed after {} ms: {}",
                target,
                request.function_type,
                request.start_address,
                request.length,
                outcome.elapsed_ms,
                failure
            ),
        }

        let log_entry = self.recorder.record(request, &outcome).await;

        Ok(ExecutionReport {
            outcome,
            metrics,
            log_entry,
        })
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::storage::{LogQuery, LogStore, MemoryLogStore};
    use crate::transport::RegisterClient;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Never finishes connecting
    struct HangingConnector;

    #[async_trait]
    impl DeviceConnector for HangingConnector {
        async fn connect(
            &self,
            _target: &DeviceTarget,
        ) -> Result<Box<dyn RegisterClient>, ConnectError> {
            std::future::pending().await
        }
    }

    struct RefusingConnector;

    #[async_trait]
    impl DeviceConnector for RefusingConnector {
        async fn connect(
            &self,
            _target: &DeviceTarget,
        ) -> Result<Box<dyn RegisterClient>, ConnectError> {
            Err(ConnectError::Socket("Connection refused (os error 111)".into()))
        }
    }

    /// Answers reads with a fixed register image, or a fault
    struct ScriptedConnector {
        fault: Option<DeviceFault>,
        connects: AtomicUsize,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn new(fault: Option<DeviceFault>) -> Self {
            Self {
                fault,
                connects: AtomicUsize::new(0),
                closes: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    struct ScriptedClient {
        fault: Option<DeviceFault>,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedClient {
        fn answer<T>(&self, value: T) -> Result<T, DeviceFault> {
            match &self.fault {
                Some(fault) => Err(fault.clone()),
                None => Ok(value),
            }
        }
    }

    #[async_trait]
    impl RegisterClient for ScriptedClient {
        async fn read_holding_registers(
            &mut self,
            start: u16,
            count: u16,
        ) -> Result<Vec<u16>, DeviceFault> {
            self.answer((start..start + count).collect())
        }

        async fn read_input_registers(
            &mut self,
            _start: u16,
            count: u16,
        ) -> Result<Vec<u16>, DeviceFault> {
            self.answer(vec![7; count as usize])
        }

        async fn write_single_register(&mut self, _: u16, _: u16) -> Result<(), DeviceFault> {
            self.answer(())
        }

        async fn write_multiple_registers(&mut self, _: u16, _: &[u16]) -> Result<(), DeviceFault> {
            self.answer(())
        }

        async fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl DeviceConnector for ScriptedConnector {
        async fn connect(
            &self,
            _target: &DeviceTarget,
        ) -> Result<Box<dyn RegisterClient>, ConnectError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedClient {
                fault: self.fault.clone(),
                closes: Arc::clone(&self.closes),
            }))
        }
    }

    fn request(function_type: &str, start: i64, length: i64, data: Option<&str>) -> TransactionRequest {
        TransactionRequest {
            host: "10.0.0.5".into(),
            port: 502,
            unit_id: 1,
            function_type: function_type.into(),
            start_address: start,
            length,
            write_data: data.map(String::from),
        }
    }

    fn executor(
        connector: Arc<dyn DeviceConnector>,
        timeout_ms: u64,
    ) -> (TransactionExecutor, Arc<MemoryLogStore>) {
        let store = Arc::new(MemoryLogStore::new());
        let recorder = OutcomeRecorder::new(store.clone());
        let config = ExecutorConfig {
            connection_timeout: Duration::from_millis(timeout_ms),
        };
        (TransactionExecutor::new(connector, recorder, config), store)
    }

    #[test]
    fn test_state_transitions() {
        use TransactionState::*;
        assert!(Connecting.can_advance_to(Executing));
        assert!(Connecting.can_advance_to(Failed));
        assert!(!Connecting.can_advance_to(Completed));
        assert!(Executing.can_advance_to(Completed));
        assert!(!Completed.can_advance_to(Failed));
        assert!(Failed.is_terminal() && Completed.is_terminal());
        assert!(!Executing.is_terminal());
    }

    #[tokio::test]
    async fn test_successful_read_is_recorded_once() {
        let connector = Arc::new(ScriptedConnector::new(None));
        let (executor, store) = executor(connector.clone(), 1_000);

        let report = executor
            .execute(&request("readHoldingRegisters", 10, 3, None))
            .await
            .unwrap();

        let response = report.outcome.result.clone().unwrap();
        assert_eq!(response.values, vec![10, 11, 12]);
        assert!(report.metrics.total_ms >= report.metrics.connect_ms);

        let entries = store.list(&LogQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].is_success);
        assert!(entries[0].execution_time >= 0);
        assert_eq!(report.log_entry.unwrap().id, entries[0].id);
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_timeout_is_recorded() {
        let (executor, store) = executor(Arc::new(HangingConnector), 50);

        let report = executor
            .execute(&request("readHoldingRegisters", 0, 4, None))
            .await
            .unwrap();

        assert_eq!(report.outcome.result, Err(TransactionFailure::ConnectTimeout));
        assert!(report.outcome.elapsed_ms >= 50);

        let entries = store.list(&LogQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_success);
        assert_eq!(entries[0].error_message.as_deref(), Some("Connection timeout"));
    }

    #[tokio::test]
    async fn test_socket_error_is_recorded() {
        let (executor, store) = executor(Arc::new(RefusingConnector), 1_000);

        let report = executor
            .execute(&request("readInputRegisters", 0, 1, None))
            .await
            .unwrap();

        let failure = report.outcome.result.unwrap_err();
        assert_eq!(
            failure.to_string(),
            "Connection error: Connection refused (os error 111)"
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_device_fault_is_recorded_and_connection_closed() {
        let connector = Arc::new(ScriptedConnector::new(Some(DeviceFault::Offline(
            "connection reset".into(),
        ))));
        let (executor, store) = executor(connector.clone(), 1_000);

        let report = executor
            .execute(&request("writeSingleRegister", 3, 42, None))
            .await
            .unwrap();

        assert!(!report.outcome.is_success());
        let entry = store.get(1).await.unwrap().unwrap();
        assert_eq!(
            entry.error_message.as_deref(),
            Some("Device offline: connection reset")
        );
        assert_eq!(connector.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_errors_never_reach_transport() {
        let connector = Arc::new(ScriptedConnector::new(None));
        let (executor, store) = executor(connector.clone(), 1_000);

        let cases = [
            request("writeSingleRegister", 0, 65536, None),
            request("writeMultipleRegisters", 0, 3, Some("1,2")),
            request("writeMultipleRegisters", 0, 2, None),
            request("readCoils", 0, 1, None),
        ];
        for req in &cases {
            assert!(executor.execute(req).await.is_err());
        }

        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }
}
