//! Transaction ID service.
//!
//! Issues `TXN-000001`, `TXN-000002`, ... from a counter persisted after every
//! issue. The counter file holds the next value to hand out.

use axum::{Json, Router, extract::State, routing::post};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::proto::TransactionIdResponse;

#[derive(Debug, Error)]
pub enum TxIdError {
    #[error("Counter file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid counter value in {path}: {value:?}")]
    InvalidCounter { path: String, value: String },
}

pub fn format_transaction_id(n: u64) -> String {
    format!("TXN-{:06}", n)
}

pub struct TransactionIdGenerator {
    next: Mutex<u64>,
    path: Option<PathBuf>,
}

impl TransactionIdGenerator {
    pub fn in_memory(start: u64) -> Self {
        Self {
            next: Mutex::new(start),
            path: None,
        }
    }

    /// Load the counter, creating the file with `1` if missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, TxIdError> {
        let path = path.into();
        let next = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content
                .trim()
                .parse::<u64>()
                .map_err(|_| TxIdError::InvalidCounter {
                    path: path.display().to_string(),
                    value: content.trim().to_string(),
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, "1").await?;
                info!(path = %path.display(), "Created new counter file with initial value 1");
                1
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), next, "Loaded transaction counter");
        Ok(Self {
            next: Mutex::new(next),
            path: Some(path),
        })
    }

    /// Hand out the next ID. A failed persist is logged; the ID is still issued.
    pub async fn next_id(&self) -> String {
        let mut next = self.next.lock().await;
        let id = format_transaction_id(*next);
        *next += 1;

        if let Some(path) = &self.path
            && let Err(e) = tokio::fs::write(path, next.to_string()).await
        {
            warn!(txn_id = %id, error = %e, "Failed to persist counter after generating ID");
        }
        info!(txn_id = %id, "Assigned transaction ID");
        id
    }

    pub async fn peek_next(&self) -> u64 {
        *self.next.lock().await
    }
}

pub fn router(generator: Arc<TransactionIdGenerator>) -> Router {
    Router::new()
        .route("/v1/transaction_id", post(new_transaction_id).get(new_transaction_id))
        .with_state(generator)
}

async fn new_transaction_id(State(generator): State<Arc<TransactionIdGenerator>>) -> Json<TransactionIdResponse> {
    Json(TransactionIdResponse {
        transaction_id: generator.next_id().await,
    })
}

pub async fn serve(listener: TcpListener, generator: Arc<TransactionIdGenerator>) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    let next = generator.peek_next().await;
    info!(%addr, next, "Transaction ID server listening");
    axum::serve(listener, router(generator)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_transaction_id(1), "TXN-000001");
        assert_eq!(format_transaction_id(1_234_567), "TXN-1234567");
    }

    #[tokio::test]
    async fn test_counter_persists_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transaction_counter.txt");

        let generator = TransactionIdGenerator::open(&path).await.unwrap();
        assert_eq!(generator.next_id().await, "TXN-000001");
        assert_eq!(generator.next_id().await, "TXN-000002");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3");

        let restarted = TransactionIdGenerator::open(&path).await.unwrap();
        assert_eq!(restarted.next_id().await, "TXN-000003");
    }

    #[tokio::test]
    async fn test_invalid_counter_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transaction_counter.txt");
        std::fs::write(&path, "abc").unwrap();
        assert!(matches!(
            TransactionIdGenerator::open(&path).await,
            Err(TxIdError::InvalidCounter { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_ids_are_unique() {
        let generator = Arc::new(TransactionIdGenerator::in_memory(1));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let g = generator.clone();
            handles.push(tokio::spawn(async move { g.next_id().await }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(generator.peek_next().await, 17);
    }
}
