//! Participant State Machine
//!
//! One `Bank` owns its ledger exclusively and executes Prepare / Commit /
//! Abort for both transfer legs.
//!
//! - Prepare checks, never deducts. Two concurrent prepares against the same
//!   account can both pass; only Commit moves funds.
//! - Commit consumes the matching reservation, rewrites the ledger under the
//!   ledger lock and records the composite key in the journal.
//! - Abort drops the reservation if present. It cannot undo a commit.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::BankError;
use super::journal::{JournalEntry, TransferJournal};
use super::reservation::{PreparedReservation, ReservationTable, ReserveOutcome};
use crate::ledger::{LedgerStore, find_account, find_account_mut};
use crate::money::Amount;
use crate::proto::{BalanceResponse, DebitCreditRequest, DebitCreditResponse, Leg, Phase};
use crate::status::ServiceStatus;

/// Successful result of one participant call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegOutcome {
    Prepared,
    /// Identical reservation already outstanding
    AlreadyPrepared,
    Committed,
    Aborted,
    /// Composite key is already in the journal
    AlreadyProcessed,
}

pub struct Bank {
    name: String,
    status: Arc<ServiceStatus>,
    ledger: Arc<dyn LedgerStore>,
    /// Serializes read -> decide -> write of the whole ledger table
    ledger_lock: Mutex<()>,
    reservations: ReservationTable,
    journal: Arc<TransferJournal>,
}

impl Bank {
    pub fn new(
        name: impl Into<String>,
        status: Arc<ServiceStatus>,
        ledger: Arc<dyn LedgerStore>,
        journal: Arc<TransferJournal>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            ledger,
            ledger_lock: Mutex::new(()),
            reservations: ReservationTable::new(),
            journal,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &Arc<ServiceStatus> {
        &self.status
    }

    pub fn journal(&self) -> &TransferJournal {
        &self.journal
    }

    pub fn reservations(&self) -> &ReservationTable {
        &self.reservations
    }

    fn ensure_online(&self) -> Result<(), BankError> {
        if self.status.is_online() {
            Ok(())
        } else {
            Err(BankError::Offline)
        }
    }

    // ------------------------------------------------------------------
    // Prepare
    // ------------------------------------------------------------------

    pub async fn prepare(&self, leg: Leg, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.ensure_online()?;
        if req.account_id == req.counterparty_account {
            return Err(BankError::SelfTransfer);
        }
        if !req.amount.is_positive() {
            return Err(BankError::InvalidAmount);
        }

        let key = leg.composite_key(&req.transaction_id);
        if self.journal.contains(&key) {
            debug!(bank = %self.name, key = %key, "Prepare for committed key, skipping");
            return Ok(LegOutcome::AlreadyProcessed);
        }

        let _guard = self.ledger_lock.lock().await;
        // Commit journals the key under this lock; a commit that won the
        // lock while we waited must not get a fresh reservation behind it.
        if self.journal.contains(&key) {
            debug!(bank = %self.name, key = %key, "Key committed while waiting for ledger, skipping");
            return Ok(LegOutcome::AlreadyProcessed);
        }
        let records = self.ledger.read_all()?;
        let account = find_account(&records, &req.account_id)
            .ok_or_else(|| BankError::AccountNotFound(req.account_id.clone()))?;

        if leg == Leg::Debit && account.balance < req.amount {
            return Err(BankError::InsufficientFunds {
                account_id: req.account_id.clone(),
                balance: account.balance,
                requested: req.amount,
            });
        }

        match self
            .reservations
            .reserve(key.clone(), PreparedReservation::new(leg, req))
        {
            Ok(ReserveOutcome::Reserved) => {
                info!(
                    bank = %self.name,
                    key = %key,
                    account = %req.account_id,
                    amount = %req.amount,
                    "Prepared {}", leg
                );
                Ok(LegOutcome::Prepared)
            }
            Ok(ReserveOutcome::AlreadyPrepared) => {
                debug!(bank = %self.name, key = %key, "Duplicate prepare, reservation unchanged");
                Ok(LegOutcome::AlreadyPrepared)
            }
            Err(conflict) => {
                warn!(
                    bank = %self.name,
                    key = %key,
                    held_amount = %conflict.existing.amount,
                    "Rejected prepare conflicting with outstanding reservation"
                );
                Err(BankError::ReservationConflict(key))
            }
        }
    }

    pub async fn prepare_debit(&self, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.prepare(Leg::Debit, req).await
    }

    pub async fn prepare_credit(&self, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.prepare(Leg::Credit, req).await
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    pub async fn commit(&self, leg: Leg, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.ensure_online()?;

        let key = leg.composite_key(&req.transaction_id);
        let Some(reservation) = self.reservations.take_matching(&key, leg, req) else {
            if let Some(entry) = self.journal.get(&key)
                && entry.matches(leg, req)
            {
                debug!(bank = %self.name, key = %key, "Commit for committed key, skipping");
                return Ok(LegOutcome::AlreadyProcessed);
            }
            return Err(BankError::NoMatchingPrepare { leg, key });
        };

        // Reservation is gone from here on. A failure below leaves the
        // transfer half-applied and is only reported.
        let _guard = self.ledger_lock.lock().await;
        let mut records = self.ledger.read_all().inspect_err(|e| {
            warn!(bank = %self.name, key = %key, error = %e, "Commit lost: failed to read ledger");
        })?;

        let Some(account) = find_account_mut(&mut records, &reservation.account_id) else {
            warn!(bank = %self.name, key = %key, account = %reservation.account_id, "Commit lost: account vanished after prepare");
            return Err(BankError::AccountNotFound(reservation.account_id));
        };
        match leg {
            Leg::Debit => account.balance -= reservation.amount,
            Leg::Credit => account.balance += reservation.amount,
        }
        let new_balance = account.balance;

        self.ledger.write_all(&records).inspect_err(|e| {
            warn!(bank = %self.name, key = %key, error = %e, "Commit lost: failed to write ledger");
        })?;

        if let Err(e) = self.journal.record(JournalEntry::for_commit(key.clone(), leg, req)) {
            warn!(bank = %self.name, key = %key, error = %e, "Ledger updated but transfer record not persisted");
        }

        if new_balance.is_negative() {
            warn!(
                bank = %self.name,
                key = %key,
                account = %reservation.account_id,
                balance = %new_balance,
                "Account overdrawn by concurrently prepared debits"
            );
        }

        info!(
            bank = %self.name,
            key = %key,
            account = %reservation.account_id,
            amount = %reservation.amount,
            balance = %new_balance,
            "Committed {}", leg
        );
        Ok(LegOutcome::Committed)
    }

    pub async fn commit_debit(&self, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.commit(Leg::Debit, req).await
    }

    pub async fn commit_credit(&self, req: &DebitCreditRequest) -> Result<LegOutcome, BankError> {
        self.commit(Leg::Credit, req).await
    }

    // ------------------------------------------------------------------
    // Abort
    // ------------------------------------------------------------------

    /// Always succeeds, also while offline.
    pub fn abort(&self, leg: Leg, req: &DebitCreditRequest) -> LegOutcome {
        let key = leg.composite_key(&req.transaction_id);
        match self.reservations.discard(&key) {
            Some(r) => info!(bank = %self.name, key = %key, amount = %r.amount, "Aborted {}", leg),
            None if self.journal.contains(&key) => warn!(
                bank = %self.name,
                key = %key,
                "Abort after commit is a no-op, committed {} stays applied", leg
            ),
            None => debug!(bank = %self.name, key = %key, "Abort without reservation"),
        }
        LegOutcome::Aborted
    }

    pub fn abort_debit(&self, req: &DebitCreditRequest) -> LegOutcome {
        self.abort(Leg::Debit, req)
    }

    pub fn abort_credit(&self, req: &DebitCreditRequest) -> LegOutcome {
        self.abort(Leg::Credit, req)
    }

    // ------------------------------------------------------------------
    // Queries / dispatch
    // ------------------------------------------------------------------

    pub async fn get_balance(&self, account_id: &str) -> Result<Amount, BankError> {
        self.ensure_online()?;
        let _guard = self.ledger_lock.lock().await;
        let records = self.ledger.read_all()?;
        find_account(&records, account_id)
            .map(|a| a.balance)
            .ok_or_else(|| BankError::AccountNotFound(account_id.to_string()))
    }

    /// Run one participant call and fold the result into a wire response.
    pub async fn execute(&self, leg: Leg, phase: Phase, req: &DebitCreditRequest) -> DebitCreditResponse {
        let result = match phase {
            Phase::Prepare => self.prepare(leg, req).await,
            Phase::Commit => self.commit(leg, req).await,
            Phase::Abort => Ok(self.abort(leg, req)),
        };
        match result {
            Ok(LegOutcome::AlreadyProcessed) => DebitCreditResponse::already_processed(),
            Ok(outcome) => DebitCreditResponse::ok(success_message(leg, outcome)),
            Err(e) => {
                debug!(bank = %self.name, txn_id = %req.transaction_id, kind = %e.kind(), error = %e, "{} {} rejected", leg, phase);
                DebitCreditResponse::failed(e.kind(), e.to_string())
            }
        }
    }

    pub async fn balance_response(&self, account_id: &str) -> BalanceResponse {
        match self.get_balance(account_id).await {
            Ok(balance) => BalanceResponse {
                success: true,
                balance,
                message: "Balance retrieved successfully".to_string(),
                kind: None,
            },
            Err(e) => BalanceResponse::failed(e.kind(), e.to_string()),
        }
    }
}

fn success_message(leg: Leg, outcome: LegOutcome) -> String {
    let side = match leg {
        Leg::Debit => "Debit",
        Leg::Credit => "Credit",
    };
    match outcome {
        LegOutcome::Prepared | LegOutcome::AlreadyPrepared => format!("{} prepared successfully", side),
        LegOutcome::Committed => format!("{} committed successfully", side),
        LegOutcome::Aborted => format!("{} aborted", side),
        LegOutcome::AlreadyProcessed => "Transaction already processed.".to_string(),
    }
}
