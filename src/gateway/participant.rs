//! Participant adapters.
//!
//! The coordinator talks to banks only through [`Participant`]. Each call is
//! a unary request with the connector's timeout; a participant's own
//! `success: false` answer is `Ok`, only transport faults are `Err`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::bank::Bank;
use crate::proto::{
    BalanceRequest, BalanceResponse, DebitCreditRequest, DebitCreditResponse, Leg, Phase,
    participant_path,
};
use crate::rpc::{RpcClient, RpcError, normalize_base_url};

#[async_trait]
pub trait Participant: Send + Sync {
    /// Bank name for logging
    fn bank_name(&self) -> &str;

    async fn call(
        &self,
        leg: Leg,
        phase: Phase,
        req: &DebitCreditRequest,
    ) -> Result<DebitCreditResponse, RpcError>;

    async fn get_balance(&self, req: &BalanceRequest) -> Result<BalanceResponse, RpcError>;
}

/// Resolves a registered address into a callable participant.
pub trait ParticipantConnector: Send + Sync {
    fn connect(&self, bank_name: &str, address: &str) -> Result<Arc<dyn Participant>, RpcError>;
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpParticipant {
    bank_name: String,
    base_url: String,
    rpc: RpcClient,
}

impl HttpParticipant {
    pub fn new(bank_name: impl Into<String>, address: &str, rpc: RpcClient) -> Self {
        Self {
            bank_name: bank_name.into(),
            base_url: normalize_base_url(address),
            rpc,
        }
    }
}

#[async_trait]
impl Participant for HttpParticipant {
    fn bank_name(&self) -> &str {
        &self.bank_name
    }

    async fn call(
        &self,
        leg: Leg,
        phase: Phase,
        req: &DebitCreditRequest,
    ) -> Result<DebitCreditResponse, RpcError> {
        let url = format!("{}{}", self.base_url, participant_path(leg, phase));
        self.rpc.post_json(&url, req, None).await
    }

    async fn get_balance(&self, req: &BalanceRequest) -> Result<BalanceResponse, RpcError> {
        let url = format!("{}/v1/balance", self.base_url);
        self.rpc.post_json(&url, req, None).await
    }
}

/// Connects over HTTP with a shared client and per-call timeout.
pub struct HttpConnector {
    rpc: RpcClient,
}

impl HttpConnector {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

impl ParticipantConnector for HttpConnector {
    fn connect(&self, bank_name: &str, address: &str) -> Result<Arc<dyn Participant>, RpcError> {
        Ok(Arc::new(HttpParticipant::new(bank_name, address, self.rpc.clone())))
    }
}

// ============================================================================
// In-process
// ============================================================================

/// Calls a [`Bank`] directly, no transport in between.
pub struct LocalParticipant {
    bank: Arc<Bank>,
}

impl LocalParticipant {
    pub fn new(bank: Arc<Bank>) -> Self {
        Self { bank }
    }
}

#[async_trait]
impl Participant for LocalParticipant {
    fn bank_name(&self) -> &str {
        self.bank.name()
    }

    async fn call(
        &self,
        leg: Leg,
        phase: Phase,
        req: &DebitCreditRequest,
    ) -> Result<DebitCreditResponse, RpcError> {
        Ok(self.bank.execute(leg, phase, req).await)
    }

    async fn get_balance(&self, req: &BalanceRequest) -> Result<BalanceResponse, RpcError> {
        Ok(self.bank.balance_response(&req.account_id).await)
    }
}

/// Address book of in-process banks. Unknown addresses behave like an
/// unreachable host.
#[derive(Default)]
pub struct LocalConnector {
    banks: DashMap<String, Arc<Bank>>,
}

impl LocalConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, address: impl Into<String>, bank: Arc<Bank>) {
        self.banks.insert(address.into(), bank);
    }

    /// Simulate the process at `address` disappearing.
    pub fn remove(&self, address: &str) -> Option<Arc<Bank>> {
        self.banks.remove(address).map(|(_, b)| b)
    }
}

impl ParticipantConnector for LocalConnector {
    fn connect(&self, bank_name: &str, address: &str) -> Result<Arc<dyn Participant>, RpcError> {
        let bank = self.banks.get(address).map(|b| b.value().clone()).ok_or_else(|| {
            RpcError::Unavailable {
                target: format!("{}@{}", bank_name, address),
                reason: "connection refused".to_string(),
            }
        })?;
        Ok(Arc::new(LocalParticipant::new(bank)))
    }
}
