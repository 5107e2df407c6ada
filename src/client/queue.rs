use std::mem;
use tokio::sync::Mutex;
use tracing::info;

use crate::proto::TransferRequest;

/// Transfers waiting to be replayed, stored verbatim.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    pending: Mutex<Vec<TransferRequest>>,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, req: TransferRequest) {
        info!(txn_id = %req.transaction_id, "Queued for offline processing");
        self.pending.lock().await.push(req);
    }

    /// Swap out everything pending in one step.
    pub async fn take_all(&self) -> Vec<TransferRequest> {
        mem::take(&mut *self.pending.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Amount;

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
    async fn test_take_all_empties_queue() {
        let queue = OfflineQueue::new();
        queue.push(req("TXN-000001")).await;
        queue.push(req("TXN-000002")).await;

        let taken = queue.take_all().await;
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0], req("TXN-000001"));
        assert!(queue.is_empty().await);
    }
}
