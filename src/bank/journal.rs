//! Idempotency Log
//!
//! Monotone set of composite keys whose commit already mutated the ledger,
//! backed by the append-only transfer record file `<bank>_transactions.txt`:
//!
//! ```text
//! TXN-000001-debit,ACC1,ACC2,250.00,debit,2026-10-19T08:00:00Z
//! ```
//!
//! Keys are only ever added. The file is replayed at startup.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::money::Amount;
use crate::proto::{DebitCreditRequest, Leg};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("Journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal format error: {0}")]
    Csv(#[from] csv::Error),
}

/// One committed leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub key: String,
    /// Payer of the transfer
    pub sender_account: String,
    /// Payee of the transfer
    pub receiver_account: String,
    pub amount: Amount,
    pub operation: Leg,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Record for a committed leg; payer/payee swap for the credit side.
    pub fn for_commit(key: impl Into<String>, leg: Leg, req: &DebitCreditRequest) -> Self {
        let (sender_account, receiver_account) = match leg {
            Leg::Debit => (req.account_id.clone(), req.counterparty_account.clone()),
            Leg::Credit => (req.counterparty_account.clone(), req.account_id.clone()),
        };
        Self {
            key: key.into(),
            sender_account,
            receiver_account,
            amount: req.amount,
            operation: leg,
            recorded_at: Some(Utc::now()),
        }
    }

    /// True when `req` describes the same leg this entry committed.
    pub fn matches(&self, leg: Leg, req: &DebitCreditRequest) -> bool {
        let expected = Self::for_commit(self.key.clone(), leg, req);
        self.operation == leg
            && self.sender_account == expected.sender_account
            && self.receiver_account == expected.receiver_account
            && self.amount == req.amount
    }
}

pub struct TransferJournal {
    committed: DashMap<String, JournalEntry>,
    path: Option<PathBuf>,
}

impl TransferJournal {
    /// Journal without a backing file.
    pub fn in_memory() -> Self {
        Self {
            committed: DashMap::new(),
            path: None,
        }
    }

    /// `<data_dir>/<bank>_transactions.txt`
    pub fn path_for(data_dir: impl AsRef<Path>, bank_name: &str) -> PathBuf {
        data_dir
            .as_ref()
            .join(format!("{}_transactions.txt", bank_name))
    }

    /// Load every committed key from `path`, creating an empty file if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        let journal = Self {
            committed: DashMap::new(),
            path: Some(path.clone()),
        };

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::File::create(&path)?;
            info!(path = %path.display(), "Created new empty transactions file");
            return Ok(journal);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)?;
        for (line, row) in reader.deserialize::<JournalEntry>().enumerate() {
            match row {
                Ok(entry) => {
                    journal.committed.insert(entry.key.clone(), entry);
                }
                Err(e) => warn!(line = line + 1, error = %e, "Skipping malformed journal line"),
            }
        }
        info!(
            path = %path.display(),
            committed = journal.committed.len(),
            "Loaded transactions journal"
        );
        Ok(journal)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.committed.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<JournalEntry> {
        self.committed.get(key).map(|e| e.value().clone())
    }

    /// Mark the key committed, then append it to the file.
    ///
    /// The in-memory mark survives a failed append so this process never
    /// re-applies the leg; the error is returned for the caller to log.
    pub fn record(&self, entry: JournalEntry) -> Result<(), JournalError> {
        self.committed.insert(entry.key.clone(), entry.clone());

        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(&entry)?;
        writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }
}
