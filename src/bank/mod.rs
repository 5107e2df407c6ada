//! Bank participant: ledger owner executing both transfer legs.

pub mod error;
pub mod journal;
pub mod participant;
pub mod registration;
pub mod reservation;
pub mod server;

pub use error::BankError;
pub use journal::{JournalEntry, JournalError, TransferJournal};
pub use participant::{Bank, LegOutcome};
pub use reservation::{PreparedReservation, ReservationTable};
