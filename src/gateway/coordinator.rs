//! Transaction Coordinator
//!
//! Drives one logical transfer across two participants:
//!
//! ```text
//! PrepareDebit(A) -> PrepareCredit(B) -> CommitDebit(A) -> CommitCredit(B)
//!        |                 |                   |                 |
//!      fail          AbortDebit(A)      AbortCredit(B)*     AbortDebit(A)**
//! ```
//!
//! `*` only when A answered and the cause was not "unreachable" or
//! "not found / auth". `**` cannot reverse the committed debit: the
//! reservation is already consumed, so the transfer stays half-applied and
//! is logged as an unresolved inconsistency.
//!
//! Steps run strictly in order. The coordinator never retries; whole-transfer
//! retry belongs to the client, made safe by participant idempotency.

use std::sync::Arc;
use tracing::{error, info, warn};

use super::error::{BankRole, FailureCause, LegFailure, TransferError};
use super::participant::{Participant, ParticipantConnector};
use super::registry::BankRegistry;
use crate::proto::{
    BalanceRequest, BalanceResponse, DebitCreditRequest, ErrorKind, Leg, Phase, TransferRequest,
};
use crate::status::ServiceStatus;

/// Result of a fully committed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction_id: String,
    pub debit_key: String,
    pub credit_key: String,
}

impl TransferReceipt {
    pub const MESSAGE: &'static str = "Transaction processed successfully";
}

pub struct TransferCoordinator {
    registry: Arc<BankRegistry>,
    connector: Arc<dyn ParticipantConnector>,
    status: Arc<ServiceStatus>,
}

impl TransferCoordinator {
    pub fn new(
        registry: Arc<BankRegistry>,
        connector: Arc<dyn ParticipantConnector>,
        status: Arc<ServiceStatus>,
    ) -> Self {
        Self {
            registry,
            connector,
            status,
        }
    }

    pub fn registry(&self) -> &Arc<BankRegistry> {
        &self.registry
    }

    pub fn status(&self) -> &Arc<ServiceStatus> {
        &self.status
    }

    fn participant(&self, role: BankRole, bank: &str) -> Result<Arc<dyn Participant>, TransferError> {
        let address = self
            .registry
            .resolve(bank)
            .ok_or_else(|| TransferError::BankNotRegistered {
                role,
                bank: bank.to_string(),
            })?;
        self.connector.connect(bank, &address).map_err(|source| {
            warn!(bank = %bank, address = %address, error = %source, "Failed to connect to {} bank", role);
            TransferError::Connect { role, source }
        })
    }

    /// Run the two-phase protocol for `req`.
    pub async fn transfer_money(&self, req: &TransferRequest) -> Result<TransferReceipt, TransferError> {
        let txn_id = req.transaction_id.as_str();
        info!(txn_id = %txn_id, from = %req.from_account, to = %req.to_account, amount = %req.amount, "TransferMoney");

        if !self.status.is_online() {
            return Err(TransferError::GatewayOffline);
        }
        if !req.amount.is_positive() {
            return Err(TransferError::InvalidAmount);
        }

        let sender = self.participant(BankRole::Sender, &req.from_bank)?;
        let receiver = self.participant(BankRole::Receiver, &req.to_bank)?;

        let debit_key = Leg::Debit.composite_key(txn_id);
        let credit_key = Leg::Credit.composite_key(txn_id);
        let debit_req = DebitCreditRequest {
            account_id: req.from_account.clone(),
            counterparty_account: req.to_account.clone(),
            amount: req.amount,
            transaction_id: req.transaction_id.clone(),
        };
        let credit_req = DebitCreditRequest {
            account_id: req.to_account.clone(),
            counterparty_account: req.from_account.clone(),
            amount: req.amount,
            transaction_id: req.transaction_id.clone(),
        };

        // === Prepare ===
        if let Err(failure) = step(&*sender, Leg::Debit, Phase::Prepare, &debit_req).await {
            let err = TransferError::DebitPrepare(failure);
            warn!(txn_id = %txn_id, key = %debit_key, kind = %err.kind(), "{}", err);
            return Err(err);
        }
        info!(txn_id = %txn_id, key = %debit_key, "Debit prepared");

        if let Err(failure) = step(&*receiver, Leg::Credit, Phase::Prepare, &credit_req).await {
            let err = TransferError::CreditPrepare(failure);
            warn!(txn_id = %txn_id, key = %credit_key, kind = %err.kind(), "{}", err);
            compensate(&*sender, Leg::Debit, &debit_req).await;
            return Err(err);
        }
        info!(txn_id = %txn_id, key = %credit_key, "Credit prepared");

        // === Commit ===
        if let Err(failure) = step(&*sender, Leg::Debit, Phase::Commit, &debit_req).await {
            let cause = failure.cause();
            let err = TransferError::DebitCommit { cause, failure };
            warn!(txn_id = %txn_id, key = %debit_key, kind = %err.kind(), "{}", err);
            if cause == FailureCause::Other {
                compensate(&*receiver, Leg::Credit, &credit_req).await;
            }
            return Err(err);
        }
        info!(txn_id = %txn_id, key = %debit_key, "Debit committed");

        if let Err(failure) = step(&*receiver, Leg::Credit, Phase::Commit, &credit_req).await {
            let cause = failure.cause();
            let err = TransferError::CreditCommit { cause, failure };
            warn!(txn_id = %txn_id, key = %credit_key, kind = %err.kind(), "{}", err);
            if !compensate(&*sender, Leg::Debit, &debit_req).await {
                error!(txn_id = %txn_id, key = %debit_key, "Critical: unable to revert debit after credit failure");
            }
            error!(
                txn_id = %txn_id,
                debit_key = %debit_key,
                credit_key = %credit_key,
                account = %req.from_account,
                amount = %req.amount,
                "Debit committed without matching credit; abort cannot reverse it"
            );
            return Err(err);
        }
        info!(txn_id = %txn_id, key = %credit_key, "Credit committed");
        info!(txn_id = %txn_id, "Transaction processed successfully");

        Ok(TransferReceipt {
            transaction_id: req.transaction_id.clone(),
            debit_key,
            credit_key,
        })
    }

    /// Single passthrough to the bank owning the account.
    pub async fn check_balance(&self, req: &BalanceRequest) -> BalanceResponse {
        let Some(address) = self.registry.resolve(&req.bank_name) else {
            let message = format!("Bank '{}' is not registered.", req.bank_name);
            warn!(bank = %req.bank_name, "{}", message);
            return BalanceResponse::failed(ErrorKind::BankNotRegistered, message);
        };
        let participant = match self.connector.connect(&req.bank_name, &address) {
            Ok(p) => p,
            Err(e) => {
                warn!(bank = %req.bank_name, error = %e, "Failed to connect to bank");
                return BalanceResponse::failed(ErrorKind::TransportFailure, "Failed to connect to bank.");
            }
        };
        match participant.get_balance(req).await {
            Ok(resp) => {
                info!(account = %req.account_id, bank = %req.bank_name, balance = %resp.balance, success = resp.success, "CheckBalance");
                resp
            }
            Err(e) => {
                warn!(bank = %req.bank_name, error = %e, "Bank GetBalance error");
                BalanceResponse::failed(e.kind(), format!("Bank error: {}", e))
            }
        }
    }
}

async fn step(
    participant: &dyn Participant,
    leg: Leg,
    phase: Phase,
    req: &DebitCreditRequest,
) -> Result<(), LegFailure> {
    match participant.call(leg, phase, req).await {
        Ok(resp) if resp.success => Ok(()),
        Ok(resp) => Err(LegFailure::from_response(&resp)),
        Err(e) => Err(LegFailure::from_rpc(&e)),
    }
}

/// Best-effort abort. Failure is logged and does not change the outcome.
async fn compensate(participant: &dyn Participant, leg: Leg, req: &DebitCreditRequest) -> bool {
    let key = leg.composite_key(&req.transaction_id);
    match step(participant, leg, Phase::Abort, req).await {
        Ok(()) => {
            info!(bank = %participant.bank_name(), key = %key, "Compensated with abort {}", leg);
            true
        }
        Err(failure) => {
            warn!(bank = %participant.bank_name(), key = %key, kind = %failure.kind, "Abort {} failed: {}", leg, failure.message);
            false
        }
    }
}
