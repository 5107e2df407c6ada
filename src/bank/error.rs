//! Participant error types.

use thiserror::Error;

use super::journal::JournalError;
use crate::ledger::LedgerError;
use crate::money::Amount;
use crate::proto::{ErrorKind, Leg};

/// Structured failure of one Prepare/Commit/GetBalance call.
///
/// Returned to the gateway as `{success: false, message, kind}`, never as a
/// transport fault.
#[derive(Error, Debug)]
pub enum BankError {
    #[error("Bank is offline")]
    Offline,

    #[error("Self-transfer not allowed.")]
    SelfTransfer,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient funds: account {account_id} has {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("No matching prepared {leg} found for {key}")]
    NoMatchingPrepare { leg: Leg, key: String },

    #[error("Conflicting prepare already outstanding for {0}")]
    ReservationConflict(String),

    #[error("Failed to access bank ledger: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Failed to write transactions journal: {0}")]
    Journal(#[from] JournalError),
}

impl BankError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BankError::Offline => ErrorKind::Offline,
            BankError::SelfTransfer => ErrorKind::SelfTransfer,
            BankError::InvalidAmount => ErrorKind::InvalidRequest,
            BankError::AccountNotFound(_) => ErrorKind::AccountNotFound,
            BankError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            BankError::NoMatchingPrepare { .. } => ErrorKind::NoMatchingPrepare,
            BankError::ReservationConflict(_) => ErrorKind::ReservationConflict,
            BankError::Ledger(_) | BankError::Journal(_) => ErrorKind::Storage,
        }
    }
}
