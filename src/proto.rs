//! Wire types shared by the gateway, the banks, the txid service and the client.
//!
//! Every response carries `success` + a human readable `message`, and, on
//! failure, a structured [`ErrorKind`] so callers never need to inspect text.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Amount;

/// Failure taxonomy carried in every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Service is administratively down
    Offline,
    SelfTransfer,
    AccountNotFound,
    InsufficientFunds,
    NoMatchingPrepare,
    /// A different prepare is outstanding under the same composite key
    ReservationConflict,
    BankNotRegistered,
    TransportFailure,
    AuthFailure,
    /// Dedup short-circuit. Only ever reported alongside `success: true`.
    AlreadyProcessed,
    InvalidRequest,
    /// Ledger or journal I/O failure at a participant
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Offline => "OFFLINE",
            ErrorKind::SelfTransfer => "SELF_TRANSFER",
            ErrorKind::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::NoMatchingPrepare => "NO_MATCHING_PREPARE",
            ErrorKind::ReservationConflict => "RESERVATION_CONFLICT",
            ErrorKind::BankNotRegistered => "BANK_NOT_REGISTERED",
            ErrorKind::TransportFailure => "TRANSPORT_FAILURE",
            ErrorKind::AuthFailure => "AUTH_FAILURE",
            ErrorKind::AlreadyProcessed => "ALREADY_PROCESSED",
            ErrorKind::InvalidRequest => "INVALID_REQUEST",
            ErrorKind::Storage => "STORAGE",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Participant (bank) RPCs
// ============================================================================

/// Which half of a transfer a participant call refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    Debit,
    Credit,
}

impl Leg {
    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Debit => "debit",
            Leg::Credit => "credit",
        }
    }

    /// `TXN-000001` -> `TXN-000001-debit`
    pub fn composite_key(&self, transaction_id: &str) -> String {
        format!("{}-{}", transaction_id, self.as_str())
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 2PC step of a participant call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Prepare,
    Commit,
    Abort,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Commit => "commit",
            Phase::Abort => "abort",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `/v1/{leg}/{phase}` on the participant.
pub fn participant_path(leg: Leg, phase: Phase) -> String {
    format!("/v1/{}/{}", leg.as_str(), phase.as_str())
}

/// Request body for every Prepare/Commit/Abort call.
///
/// `transaction_id` is the logical transfer id; the participant appends the
/// leg suffix itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitCreditRequest {
    pub account_id: String,
    pub counterparty_account: String,
    pub amount: Amount,
    pub transaction_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitCreditResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl DebitCreditResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: None,
        }
    }

    pub fn already_processed() -> Self {
        Self {
            success: true,
            message: "Transaction already processed.".to_string(),
            kind: Some(ErrorKind::AlreadyProcessed),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: Some(kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRequest {
    pub account_id: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub balance: Amount,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl BalanceResponse {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            balance: Amount::ZERO,
            message: message.into(),
            kind: Some(kind),
        }
    }
}

// ============================================================================
// Gateway RPCs
// ============================================================================

/// One logical transfer. Replayed verbatim on every retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub transaction_id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: Amount,
    pub from_bank: String,
    pub to_bank: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

impl TransferResponse {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: Some(kind),
            transaction_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub bank_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Empty on failure
    pub token: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRegisterRequest {
    pub bank_name: String,
    pub bank_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRegisterResponse {
    pub success: bool,
    pub message: String,
}

/// Generic error body for middleware rejections (401 / 503).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub kind: ErrorKind,
}

// ============================================================================
// Admin / ID generator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdResponse {
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_key() {
        assert_eq!(Leg::Debit.composite_key("TXN-000001"), "TXN-000001-debit");
        assert_eq!(Leg::Credit.composite_key("TXN-000001"), "TXN-000001-credit");
    }

    #[test]
    fn test_participant_path() {
        assert_eq!(participant_path(Leg::Debit, Phase::Prepare), "/v1/debit/prepare");
        assert_eq!(participant_path(Leg::Credit, Phase::Abort), "/v1/credit/abort");
    }

    #[test]
    fn test_error_kind_wire_name() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_FUNDS\"");
        assert_eq!(ErrorKind::NoMatchingPrepare.to_string(), "NO_MATCHING_PREPARE");
    }

    #[test]
    fn test_response_without_kind_deserializes() {
        let resp: DebitCreditResponse =
            serde_json::from_str(r#"{"success":false,"message":"Bank is offline"}"#).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.kind, None);
    }
}
