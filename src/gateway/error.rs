//! Coordinator error types.

use std::fmt;
use thiserror::Error;

use crate::proto::{DebitCreditResponse, ErrorKind};
use crate::rpc::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankRole {
    Sender,
    Receiver,
}

impl fmt::Display for BankRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankRole::Sender => f.write_str("Sender"),
            BankRole::Receiver => f.write_str("Receiver"),
        }
    }
}

/// Compensation path selector for a failed commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// Offline participant or transport fault
    Unreachable,
    NotFoundOrAuth,
    Other,
}

/// A participant call that did not succeed: either a structured refusal or a
/// transport fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// True when the participant never answered
    pub transport: bool,
}

impl LegFailure {
    pub fn from_response(resp: &DebitCreditResponse) -> Self {
        Self {
            kind: resp.kind.unwrap_or_else(|| kind_from_message(&resp.message)),
            message: resp.message.clone(),
            transport: false,
        }
    }

    pub fn from_rpc(err: &RpcError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            transport: true,
        }
    }

    pub fn cause(&self) -> FailureCause {
        if self.transport {
            return FailureCause::Unreachable;
        }
        match self.kind {
            ErrorKind::Offline | ErrorKind::TransportFailure => FailureCause::Unreachable,
            ErrorKind::AccountNotFound | ErrorKind::AuthFailure => FailureCause::NotFoundOrAuth,
            _ => FailureCause::Other,
        }
    }
}

impl fmt::Display for LegFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Only for participants that answer without a `kind`.
fn kind_from_message(message: &str) -> ErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("offline") || lower.contains("down") {
        ErrorKind::Offline
    } else if lower.contains("not found") {
        ErrorKind::AccountNotFound
    } else if lower.contains("invalid credentials") {
        ErrorKind::AuthFailure
    } else {
        ErrorKind::Internal
    }
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Gateway is offline")]
    GatewayOffline,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("{role} bank '{bank}' is not registered.")]
    BankNotRegistered { role: BankRole, bank: String },

    #[error("Failed to connect to {} bank.", role_lower(.role))]
    Connect {
        role: BankRole,
        #[source]
        source: RpcError,
    },

    #[error("Debit preparation failed: {0}")]
    DebitPrepare(LegFailure),

    #[error("Credit preparation failed: {0}")]
    CreditPrepare(LegFailure),

    #[error("Debit commit failed{}: {failure}", cause_suffix(.cause, &BankRole::Sender))]
    DebitCommit {
        cause: FailureCause,
        failure: LegFailure,
    },

    #[error("Credit commit failed{}: {failure}", cause_suffix(.cause, &BankRole::Receiver))]
    CreditCommit {
        cause: FailureCause,
        failure: LegFailure,
    },
}

fn role_lower(role: &BankRole) -> &'static str {
    match role {
        BankRole::Sender => "sender",
        BankRole::Receiver => "receiver",
    }
}

fn cause_suffix(cause: &FailureCause, role: &BankRole) -> String {
    match cause {
        FailureCause::Unreachable => format!(" due to {} bank down", role_lower(role)),
        FailureCause::NotFoundOrAuth => " due to authentication error".to_string(),
        FailureCause::Other => String::new(),
    }
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::GatewayOffline => ErrorKind::Offline,
            TransferError::InvalidAmount => ErrorKind::InvalidRequest,
            TransferError::BankNotRegistered { .. } => ErrorKind::BankNotRegistered,
            TransferError::Connect { .. } => ErrorKind::TransportFailure,
            TransferError::DebitPrepare(f) | TransferError::CreditPrepare(f) => f.kind,
            TransferError::DebitCommit { failure, .. } | TransferError::CreditCommit { failure, .. } => {
                failure.kind
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_from_kind() {
        let offline = LegFailure::from_response(&DebitCreditResponse::failed(ErrorKind::Offline, "Bank is offline"));
        assert_eq!(offline.cause(), FailureCause::Unreachable);

        let missing = LegFailure::from_response(&DebitCreditResponse::failed(
            ErrorKind::AccountNotFound,
            "Account not found: ACC9",
        ));
        assert_eq!(missing.cause(), FailureCause::NotFoundOrAuth);

        let other = LegFailure::from_response(&DebitCreditResponse::failed(
            ErrorKind::NoMatchingPrepare,
            "No matching prepared debit found for TXN-000001-debit",
        ));
        assert_eq!(other.cause(), FailureCause::Other);

        let timeout = LegFailure::from_rpc(&RpcError::Timeout { url: "http://b".into() });
        assert_eq!(timeout.cause(), FailureCause::Unreachable);
        assert_eq!(timeout.kind, ErrorKind::TransportFailure);
    }

    #[test]
    fn test_missing_kind_falls_back_to_message() {
        let resp = DebitCreditResponse {
            success: false,
            message: "Bank is down for maintenance".into(),
            kind: None,
        };
        assert_eq!(LegFailure::from_response(&resp).cause(), FailureCause::Unreachable);
    }

    #[test]
    fn test_messages() {
        let err = TransferError::BankNotRegistered {
            role: BankRole::Receiver,
            bank: "BankZ".into(),
        };
        assert_eq!(err.to_string(), "Receiver bank 'BankZ' is not registered.");
        assert_eq!(err.kind(), ErrorKind::BankNotRegistered);

        let err = TransferError::CreditCommit {
            cause: FailureCause::Unreachable,
            failure: LegFailure::from_response(&DebitCreditResponse::failed(ErrorKind::Offline, "Bank is offline")),
        };
        assert_eq!(
            err.to_string(),
            "Credit commit failed due to receiver bank down: Bank is offline (OFFLINE)"
        );
        assert_eq!(err.kind(), ErrorKind::Offline);
    }
}
