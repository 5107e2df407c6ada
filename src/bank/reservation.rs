//! Prepared reservations (in-flight legs).
//!
//! ```text
//! ABSENT → PREPARED → { COMMITTED, ABORTED }
//! ```
//!
//! COMMITTED and ABORTED drop the entry; only the journal remembers a commit.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::money::Amount;
use crate::proto::{DebitCreditRequest, Leg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedReservation {
    pub operation: Leg,
    pub account_id: String,
    pub counterparty_account: String,
    pub amount: Amount,
}

impl PreparedReservation {
    pub fn new(leg: Leg, req: &DebitCreditRequest) -> Self {
        Self {
            operation: leg,
            account_id: req.account_id.clone(),
            counterparty_account: req.counterparty_account.clone(),
            amount: req.amount,
        }
    }

    /// Operation, account, counterparty and amount must all agree.
    pub fn matches(&self, leg: Leg, req: &DebitCreditRequest) -> bool {
        self.operation == leg
            && self.account_id == req.account_id
            && self.counterparty_account == req.counterparty_account
            && self.amount == req.amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    /// Same reservation was already outstanding; nothing changed
    AlreadyPrepared,
}

/// A different reservation already holds the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationConflict {
    pub existing: PreparedReservation,
}

#[derive(Debug, Default)]
pub struct ReservationTable {
    entries: DashMap<String, PreparedReservation>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is taken. Never overwrites.
    pub fn reserve(
        &self,
        key: String,
        reservation: PreparedReservation,
    ) -> Result<ReserveOutcome, ReservationConflict> {
        match self.entries.entry(key) {
            Entry::Occupied(existing) => {
                if *existing.get() == reservation {
                    Ok(ReserveOutcome::AlreadyPrepared)
                } else {
                    Err(ReservationConflict {
                        existing: existing.get().clone(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(reservation);
                Ok(ReserveOutcome::Reserved)
            }
        }
    }

    /// Atomically remove the reservation if it matches `req`.
    pub fn take_matching(
        &self,
        key: &str,
        leg: Leg,
        req: &DebitCreditRequest,
    ) -> Option<PreparedReservation> {
        self.entries
            .remove_if(key, |_, r| r.matches(leg, req))
            .map(|(_, r)| r)
    }

    /// Drop whatever is held under `key`.
    pub fn discard(&self, key: &str) -> Option<PreparedReservation> {
        self.entries.remove(key).map(|(_, r)| r)
    }

    pub fn get(&self, key: &str) -> Option<PreparedReservation> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(amount_cents: i64) -> DebitCreditRequest {
        DebitCreditRequest {
            account_id: "ACC1".into(),
            counterparty_account: "ACC2".into(),
            amount: Amount::from_cents(amount_cents),
            transaction_id: "TXN-000001".into(),
        }
    }

    #[test]
    fn test_reserve_is_idempotent_for_same_reservation() {
        let table = ReservationTable::new();
        let r = PreparedReservation::new(Leg::Debit, &req(100));
        assert_eq!(
            table.reserve("K".into(), r.clone()),
            Ok(ReserveOutcome::Reserved)
        );
        assert_eq!(
            table.reserve("K".into(), r),
            Ok(ReserveOutcome::AlreadyPrepared)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reserve_never_overwrites() {
        let table = ReservationTable::new();
        table
            .reserve("K".into(), PreparedReservation::new(Leg::Debit, &req(100)))
            .unwrap();
        let err = table
            .reserve("K".into(), PreparedReservation::new(Leg::Debit, &req(999)))
            .unwrap_err();
        assert_eq!(err.existing.amount, Amount::from_cents(100));
        assert_eq!(table.get("K").unwrap().amount, Amount::from_cents(100));
    }

    #[test]
    fn test_take_matching_requires_exact_match() {
        let table = ReservationTable::new();
        table
            .reserve("K".into(), PreparedReservation::new(Leg::Debit, &req(100)))
            .unwrap();

        assert!(table.take_matching("K", Leg::Debit, &req(200)).is_none());
        assert!(table.take_matching("K", Leg::Credit, &req(100)).is_none());
        assert_eq!(table.len(), 1);

        assert!(table.take_matching("K", Leg::Debit, &req(100)).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_discard_missing_is_noop() {
        let table = ReservationTable::new();
        assert!(table.discard("nope").is_none());
    }
}
