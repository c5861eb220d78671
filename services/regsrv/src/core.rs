//! Transaction core: request model, dispatch, classification, execution
//! and outcome recording

pub mod classifier;
pub mod derive;
pub mod dispatcher;
pub mod executor;
pub mod recorder;
pub mod request;

pub use classifier::DeviceFault;
pub use dispatcher::DispatchError;
pub use executor::{
    ExecutionReport, ExecutorConfig, TransactionExecutor, TransactionFailure, TransactionMetrics,
    TransactionOutcome, TransactionState,
};
pub use recorder::OutcomeRecorder;
pub use request::{FunctionCode, RegisterOperation, RegisterResponse, TransactionRequest};
