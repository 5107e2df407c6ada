//! Retry Worker
//!
//! Background task that periodically replays the offline queue. Each request
//! keeps its original transaction id, so a replay of a half-finished transfer
//! is absorbed by participant idempotency.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::classify::{FailureClass, classify};
use super::resilient::TransferClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub requeued: usize,
    /// Permanent failures, not retried again
    pub dropped: usize,
}

pub struct RetryWorker {
    client: Arc<TransferClient>,
    interval: Duration,
}

impl RetryWorker {
    pub fn new(client: Arc<TransferClient>, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Sleep, drain, repeat. Never returns.
    pub async fn run(&self) -> ! {
        info!(interval_secs = self.interval.as_secs(), "Starting retry worker");
        loop {
            tokio::time::sleep(self.interval).await;
            self.drain_once().await;
        }
    }

    /// Replay everything currently queued once.
    pub async fn drain_once(&self) -> DrainReport {
        let pending = self.client.queue().take_all().await;
        let mut report = DrainReport {
            attempted: pending.len(),
            ..DrainReport::default()
        };
        if pending.is_empty() {
            debug!("Offline queue empty");
            return report;
        }

        info!(count = pending.len(), "Retrying offline transactions");
        for req in pending {
            match self.client.send(&req).await {
                Ok(resp) if resp.success => {
                    info!(txn_id = %req.transaction_id, "Offline transaction processed successfully");
                    report.succeeded += 1;
                }
                Ok(resp) if classify(&resp) == FailureClass::Permanent => {
                    warn!(txn_id = %req.transaction_id, message = %resp.message, "Offline transaction failed permanently, dropping");
                    report.dropped += 1;
                }
                Ok(resp) => {
                    warn!(txn_id = %req.transaction_id, message = %resp.message, "Offline transaction failed");
                    self.client.queue().push(req).await;
                    report.requeued += 1;
                }
                Err(e) => {
                    warn!(txn_id = %req.transaction_id, error = %e, "Offline transaction failed");
                    self.client.queue().push(req).await;
                    report.requeued += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::mock::ScriptedGateway;
    use crate::client::queue::OfflineQueue;
    use crate::money::Amount;
    use crate::proto::{ErrorKind, TransferRequest};

    fn req(id: &str) -> TransferRequest {
        TransferRequest {
            transaction_id: id.into(),
            from_account: "ACC1".into(),
            to_account: "ACC2".into(),
            amount: Amount::from_cents(100),
            from_bank: "BankA".into(),
            to_bank: "BankB".into(),
        }
    }

    #[tokio::test]
    async fn test_drain_replays_same_transaction_id() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway
            .then_unreachable()
            .then_fail(Some(ErrorKind::Offline), "Gateway is offline")
            .then_fail(Some(ErrorKind::SelfTransfer), "Self-transfer not allowed.");
        let client = Arc::new(TransferClient::new(gateway.clone(), Arc::new(OfflineQueue::new())));
        client.set_token("token-1".into()).await;
        let worker = RetryWorker::new(client.clone(), Duration::from_secs(10));

        for id in ["TXN-000001", "TXN-000002", "TXN-000003", "TXN-000004"] {
            client.queue().push(req(id)).await;
        }

        let report = worker.drain_once().await;
        assert_eq!(
            report,
            DrainReport {
                attempted: 4,
                succeeded: 1,
                requeued: 2,
                dropped: 1,
            }
        );
        assert_eq!(client.queue().len().await, 2);

        // Script exhausted: the requeued pair now goes through unchanged.
        client.set_token("token-2".into()).await;
        let report = worker.drain_once().await;
        assert_eq!(report.succeeded, 2);
        assert!(client.queue().is_empty().await);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[4].0, req("TXN-000001"));
        assert_eq!(calls[4].1, "token-2");
    }

    #[tokio::test]
    async fn test_drain_on_empty_queue() {
        let gateway = Arc::new(ScriptedGateway::new());
        let client = Arc::new(TransferClient::new(gateway.clone(), Arc::new(OfflineQueue::new())));
        let worker = RetryWorker::new(client, Duration::from_secs(10));
        assert_eq!(worker.drain_once().await, DrainReport::default());
        assert!(gateway.calls().is_empty());
    }
}
