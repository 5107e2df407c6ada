//! Client submit path.
//!
//! A transfer is sent once. Successes and permanent failures are final;
//! transient failures and transport errors put the request, unchanged, on the
//! offline queue for [`super::retry::RetryWorker`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::api::GatewayApi;
use super::classify::{FailureClass, classify};
use super::queue::OfflineQueue;
use crate::proto::{AuthRequest, BalanceRequest, BalanceResponse, TransferRequest, TransferResponse};
use crate::rpc::RpcError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(TransferResponse),
    /// Permanent failure, dropped
    Rejected(TransferResponse),
    /// Transient failure, waiting in the offline queue
    Queued { reason: String },
}

pub struct TransferClient {
    api: Arc<dyn GatewayApi>,
    queue: Arc<OfflineQueue>,
    token: RwLock<String>,
    completed: AtomicU64,
}

impl TransferClient {
    pub fn new(api: Arc<dyn GatewayApi>, queue: Arc<OfflineQueue>) -> Self {
        Self {
            api,
            queue,
            token: RwLock::new(String::new()),
            completed: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &Arc<dyn GatewayApi> {
        &self.api
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    pub async fn token(&self) -> String {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: String) {
        *self.token.write().await = token;
    }

    /// Authenticate and keep the issued token for later calls.
    pub async fn login(&self, req: &AuthRequest) -> Result<(), ClientError> {
        let resp = self.api.authenticate(req).await?;
        if resp.token.is_empty() {
            return Err(ClientError::AuthRejected(resp.message));
        }
        info!(username = %req.username, "Authentication successful");
        self.set_token(resp.token).await;
        Ok(())
    }

    /// One attempt with the current token, no classification.
    pub async fn send(&self, req: &TransferRequest) -> Result<TransferResponse, RpcError> {
        let token = self.token().await;
        self.api.transfer_money(req, &token).await
    }

    pub async fn submit(&self, req: TransferRequest) -> SubmitOutcome {
        match self.send(&req).await {
            Ok(resp) if resp.success => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                info!(txn_id = %req.transaction_id, message = %resp.message, "Transfer successful");
                SubmitOutcome::Completed(resp)
            }
            Ok(resp) => match classify(&resp) {
                FailureClass::Permanent => {
                    warn!(txn_id = %req.transaction_id, message = %resp.message, "Permanent failure");
                    SubmitOutcome::Rejected(resp)
                }
                FailureClass::Transient => {
                    warn!(txn_id = %req.transaction_id, message = %resp.message, "Transfer failed");
                    self.queue.push(req).await;
                    SubmitOutcome::Queued { reason: resp.message }
                }
            },
            Err(e) => {
                warn!(txn_id = %req.transaction_id, error = %e, "TransferMoney RPC failed");
                let reason = e.to_string();
                self.queue.push(req).await;
                SubmitOutcome::Queued { reason }
            }
        }
    }

    /// Number of transfers completed through [`Self::submit`].
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub async fn check_balance(&self, account_id: &str, bank_name: &str) -> Result<BalanceResponse, RpcError> {
        let token = self.token().await;
        let req = BalanceRequest {
            account_id: account_id.to_string(),
            bank_name: bank_name.to_string(),
        };
        self.api.check_balance(&req, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::mock::ScriptedGateway;
    use crate::money::Amount;
    use crate::proto::ErrorKind;

    fn req(id: &str) -> TransferRequest {
        TransferRequest {
            transaction_id: id.into(),
            from_account: "ACC1".into(),
            to_account: "ACC2".into(),
            amount: Amount::from_cents(25_000),
            from_bank: "BankA".into(),
            to_bank: "BankB".into(),
        }
    }

    fn client(gateway: &Arc<ScriptedGateway>) -> TransferClient {
        TransferClient::new(gateway.clone(), Arc::new(OfflineQueue::new()))
    }

    #[tokio::test]
    async fn test_success_is_not_queued() {
        let gateway = Arc::new(ScriptedGateway::new());
        let client = client(&gateway);
        client
            .login(&AuthRequest {
                username: "alice".into(),
                password: "pw".into(),
                account_id: "ACC1".into(),
            })
            .await
            .unwrap();

        assert!(matches!(client.submit(req("TXN-000001")).await, SubmitOutcome::Completed(_)));
        assert!(client.queue().is_empty().await);
        assert_eq!(client.completed(), 1);
        assert_eq!(gateway.calls()[0].1, "token-alice");
    }

    #[tokio::test]
    async fn test_permanent_failure_is_dropped() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.then_fail(Some(ErrorKind::InsufficientFunds), "Debit preparation failed: Insufficient funds");
        let client = client(&gateway);

        assert!(matches!(client.submit(req("TXN-000001")).await, SubmitOutcome::Rejected(_)));
        assert!(client.queue().is_empty().await);
    }

    #[tokio::test]
    async fn test_transient_failures_queue_request_verbatim() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway
            .then_fail(Some(ErrorKind::Offline), "Credit commit failed due to receiver bank down")
            .then_unreachable();
        let client = client(&gateway);

        assert!(matches!(client.submit(req("TXN-000001")).await, SubmitOutcome::Queued { .. }));
        assert!(matches!(client.submit(req("TXN-000002")).await, SubmitOutcome::Queued { .. }));

        let pending = client.queue().take_all().await;
        assert_eq!(pending, vec![req("TXN-000001"), req("TXN-000002")]);
    }
}
