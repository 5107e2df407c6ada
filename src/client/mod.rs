//! Client resilience layer.

pub mod api;
pub mod classify;
pub mod queue;
pub mod resilient;
pub mod retry;

pub use api::{GatewayApi, HttpGatewayClient, HttpTxIdClient, TxIdSource};
pub use classify::{FailureClass, classify};
pub use queue::OfflineQueue;
pub use resilient::{ClientError, SubmitOutcome, TransferClient};
pub use retry::{DrainReport, RetryWorker};
