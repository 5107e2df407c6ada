//! Permanent vs transient transfer failures.
//!
//! Permanent failures are logged and dropped. Everything else is queued and
//! replayed with the same transaction id.

use crate::proto::{ErrorKind, TransferResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Permanent,
    Transient,
}

/// Lower-case fragments marking a permanent failure when no `kind` is present.
pub const PERMANENT_KEYWORDS: [&str; 11] = [
    "not registered",
    "does not exist",
    "self-transfer not allowed",
    "insufficient",
    "invalid credentials",
    "already processed",
    "duplicate transaction",
    "already registered",
    "invalid transaction",
    "malformed",
    "account not found",
];

pub fn is_permanent_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BankNotRegistered
            | ErrorKind::SelfTransfer
            | ErrorKind::InsufficientFunds
            | ErrorKind::AuthFailure
            | ErrorKind::AccountNotFound
            | ErrorKind::AlreadyProcessed
            | ErrorKind::InvalidRequest
    )
}

pub fn is_permanent_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    PERMANENT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Classify a failed gateway answer.
pub fn classify(resp: &TransferResponse) -> FailureClass {
    let permanent = match resp.kind {
        Some(kind) => is_permanent_kind(kind),
        None => is_permanent_message(&resp.message),
    };
    if permanent {
        FailureClass::Permanent
    } else {
        FailureClass::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(kind: Option<ErrorKind>, message: &str) -> TransferResponse {
        TransferResponse {
            success: false,
            message: message.to_string(),
            kind,
            transaction_id: None,
        }
    }

    #[test]
    fn test_kind_wins_over_message() {
        assert_eq!(
            classify(&failed(Some(ErrorKind::Offline), "account not found")),
            FailureClass::Transient
        );
        assert_eq!(
            classify(&failed(Some(ErrorKind::InsufficientFunds), "whatever")),
            FailureClass::Permanent
        );
        assert_eq!(
            classify(&failed(Some(ErrorKind::TransportFailure), "timed out")),
            FailureClass::Transient
        );
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(
            classify(&failed(None, "Sender bank 'X' is not registered.")),
            FailureClass::Permanent
        );
        assert_eq!(
            classify(&failed(None, "Debit preparation failed: Insufficient funds")),
            FailureClass::Permanent
        );
        assert_eq!(
            classify(&failed(None, "Credit commit failed due to receiver bank down")),
            FailureClass::Transient
        );
    }
}
