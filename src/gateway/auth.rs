//! Gateway users and bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings in a CSV users file that is
//! rewritten in full on every registration:
//!
//! ```text
//! username,password_hash,account_id,bank_name
//! alice,$argon2id$v=19$...,ACC1,BankA
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::proto::ErrorKind;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials or user not registered";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Users file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Users file format error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("{}", INVALID_CREDENTIALS)]
    InvalidCredentials,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials => ErrorKind::AuthFailure,
            _ => ErrorKind::Storage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub bank_name: String,
}

// ============================================================================
// UserStore
// ============================================================================

pub struct UserStore {
    users: DashMap<String, UserRecord>,
    path: Option<PathBuf>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self {
            users: DashMap::new(),
            path: None,
        }
    }

    /// Load users from `path`. A missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let store = Self {
            users: DashMap::new(),
            path: Some(path.clone()),
        };
        if !path.exists() {
            info!(path = %path.display(), "No users file yet, starting empty");
            return Ok(store);
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;
        for row in reader.deserialize::<UserRecord>() {
            let record = row?;
            store.users.insert(record.username.clone(), record);
        }
        info!(path = %path.display(), users = store.users.len(), "Loaded gateway users");
        Ok(store)
    }

    /// Add or replace a user, then rewrite the users file.
    pub fn register(
        &self,
        username: &str,
        password: &str,
        account_id: &str,
        bank_name: &str,
    ) -> Result<(), AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();

        self.users.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                password_hash,
                account_id: account_id.to_string(),
                bank_name: bank_name.to_string(),
            },
        );
        self.persist()?;
        info!(username = %username, account = %account_id, bank = %bank_name, "User registered");
        Ok(())
    }

    pub fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let Some(user) = self.users.get(username) else {
            debug!(username = %username, "Unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        let parsed = PasswordHash::new(&user.password_hash).map_err(|_| AuthError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    pub fn get(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).map(|u| u.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn persist(&self) -> Result<(), AuthError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut records: Vec<UserRecord> = self.users.iter().map(|u| u.value().clone()).collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));

        let tmp = path.with_extension("tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for record in &records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Opaque session tokens (`token -> username`). Tokens never expire.
#[derive(Debug, Default)]
pub struct TokenStore {
    tokens: DashMap<String, String>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, username: &str) -> String {
        let token = format!("token-{}", uuid::Uuid::new_v4());
        self.tokens.insert(token.clone(), username.to_string());
        token
    }

    /// Username owning `token`.
    pub fn validate(&self, token: &str) -> Option<String> {
        self.tokens.get(token).map(|u| u.value().clone())
    }
}

/// Accepts `Bearer <token>` or the bare token.
pub fn token_from_header(value: &str) -> &str {
    let value = value.trim();
    value.strip_prefix("Bearer ").map(str::trim).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_verify() {
        let store = UserStore::in_memory();
        store.register("alice", "secret", "ACC1", "BankA").unwrap();

        assert!(store.verify("alice", "secret").is_ok());
        assert!(matches!(
            store.verify("alice", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(store.verify("bob", "secret").is_err());
        assert!(store.get("alice").unwrap().password_hash.starts_with("$argon2"));
    }

    #[test]
    fn test_reregister_replaces_password() {
        let store = UserStore::in_memory();
        store.register("alice", "one", "ACC1", "BankA").unwrap();
        store.register("alice", "two", "ACC1", "BankA").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.verify("alice", "one").is_err());
        assert!(store.verify("alice", "two").is_ok());
    }

    #[test]
    fn test_users_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway_users.txt");

        let store = UserStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.register("alice", "secret", "ACC1", "BankA").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("username,password_hash,account_id,bank_name"));
        assert!(!content.contains("secret"));

        let reopened = UserStore::open(&path).unwrap();
        assert!(reopened.verify("alice", "secret").is_ok());
        assert_eq!(reopened.get("alice").unwrap().bank_name, "BankA");
    }

    #[test]
    fn test_tokens() {
        let tokens = TokenStore::new();
        let token = tokens.issue("alice");
        assert!(token.starts_with("token-"));
        assert_eq!(tokens.validate(&token).as_deref(), Some("alice"));
        assert_eq!(tokens.validate("token-bogus"), None);
        assert_ne!(tokens.issue("alice"), token);
    }

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("Bearer token-1"), "token-1");
        assert_eq!(token_from_header("token-1"), "token-1");
    }

    #[test]
    fn test_invalid_credentials_message() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), INVALID_CREDENTIALS);
        assert_eq!(AuthError::InvalidCredentials.kind(), ErrorKind::AuthFailure);
    }
}
