//! Ledger Store
//!
//! Per-bank table of `accountId -> balance`. The store only knows how to read
//! and replace the whole table; callers hold the bank's ledger lock across
//! read -> decide -> write.
//!
//! File format (`<bank>_users.txt`):
//! ```text
//! AccountId,username,password,bank_name,balance
//! ACC1,alice,secret,BankA,1000.00
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;
use tracing::info;

use crate::money::Amount;

pub const LEDGER_HEADER: [&str; 5] = ["AccountId", "username", "password", "bank_name", "balance"];

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ledger format error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Ledger lock poisoned")]
    Poisoned,

    #[error("account number {0} already registered with different credentials")]
    AccountConflict(String),
}

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "AccountId")]
    pub account_id: String,
    pub username: String,
    pub password: String,
    pub bank_name: String,
    pub balance: Amount,
}

impl AccountRecord {
    pub fn new(
        account_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        bank_name: impl Into<String>,
        balance: Amount,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            username: username.into(),
            password: password.into(),
            bank_name: bank_name.into(),
            balance,
        }
    }
}

/// Storage backend for a bank's account table.
pub trait LedgerStore: Send + Sync {
    fn read_all(&self) -> Result<Vec<AccountRecord>, LedgerError>;

    /// Replace the full table.
    fn write_all(&self, records: &[AccountRecord]) -> Result<(), LedgerError>;
}

pub fn find_account<'a>(records: &'a [AccountRecord], account_id: &str) -> Option<&'a AccountRecord> {
    records.iter().find(|r| r.account_id == account_id)
}

pub fn find_account_mut<'a>(
    records: &'a mut [AccountRecord],
    account_id: &str,
) -> Option<&'a mut AccountRecord> {
    records.iter_mut().find(|r| r.account_id == account_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Created,
    AlreadyOpen,
}

/// Add an account with an opening balance unless it already exists with the same credentials.
pub fn open_account(
    store: &dyn LedgerStore,
    record: AccountRecord,
) -> Result<OpenOutcome, LedgerError> {
    let mut records = store.read_all()?;
    if let Some(existing) = find_account(&records, &record.account_id) {
        if existing.username == record.username && existing.password == record.password {
            return Ok(OpenOutcome::AlreadyOpen);
        }
        return Err(LedgerError::AccountConflict(record.account_id));
    }
    records.push(record);
    store.write_all(&records)?;
    Ok(OpenOutcome::Created)
}

// ============================================================================
// CSV file store
// ============================================================================

pub struct CsvLedgerStore {
    path: PathBuf,
}

impl CsvLedgerStore {
    /// `<data_dir>/<bank>_users.txt`
    pub fn path_for(data_dir: impl AsRef<Path>, bank_name: &str) -> PathBuf {
        data_dir.as_ref().join(format!("{}_users.txt", bank_name))
    }

    /// Open the ledger file, creating a header-only file if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let store = Self { path: path.into() };
        if !store.path.exists() {
            if let Some(parent) = store.path.parent() {
                fs::create_dir_all(parent)?;
            }
            store.write_all(&[])?;
            info!(path = %store.path.display(), "Created new users file");
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for CsvLedgerStore {
    fn read_all(&self) -> Result<Vec<AccountRecord>, LedgerError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    fn write_all(&self, records: &[AccountRecord]) -> Result<(), LedgerError> {
        // Write beside the target and rename so readers never see a torn table.
        let tmp = self.path.with_extension("txt.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)?;
            writer.write_record(LEDGER_HEADER)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryLedgerStore {
    records: RwLock<Vec<AccountRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(records: Vec<AccountRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn read_all(&self) -> Result<Vec<AccountRecord>, LedgerError> {
        Ok(self
            .records
            .read()
            .map_err(|_| LedgerError::Poisoned)?
            .clone())
    }

    fn write_all(&self, records: &[AccountRecord]) -> Result<(), LedgerError> {
        *self.records.write().map_err(|_| LedgerError::Poisoned)? = records.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountRecord {
        AccountRecord::new("ACC1", "alice", "pw", "BankA", Amount::from_cents(100_000))
    }

    #[test]
    fn test_csv_store_creates_header_only_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = CsvLedgerStore::path_for(dir.path(), "BankA");
        let store = CsvLedgerStore::open(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim(), "AccountId,username,password,bank_name,balance");
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_csv_store_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvLedgerStore::open(dir.path().join("BankA_users.txt")).unwrap();

        let mut bob = alice();
        bob.account_id = "ACC2".into();
        bob.balance = Amount::from_cents(50_000);
        store.write_all(&[alice(), bob.clone()]).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(find_account(&records, "ACC2"), Some(&bob));

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("ACC1,alice,pw,BankA,1000.00"));
    }

    #[test]
    fn test_csv_store_reads_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BankB_users.txt");
        fs::write(
            &path,
            "AccountId,username,password,bank_name,balance\nACC9,zed,z,BankB,12.5\n",
        )
        .unwrap();

        let store = CsvLedgerStore::open(&path).unwrap();
        let records = store.read_all().unwrap();
        assert_eq!(records[0].balance, Amount::from_cents(1250));
    }

    #[test]
    fn test_open_account() {
        let store = MemoryLedgerStore::new();
        assert_eq!(open_account(&store, alice()).unwrap(), OpenOutcome::Created);
        assert_eq!(
            open_account(&store, alice()).unwrap(),
            OpenOutcome::AlreadyOpen
        );

        let mut imposter = alice();
        imposter.password = "other".into();
        assert!(matches!(
            open_account(&store, imposter),
            Err(LedgerError::AccountConflict(id)) if id == "ACC1"
        ));
        assert_eq!(store.read_all().unwrap().len(), 1);
    }
}
