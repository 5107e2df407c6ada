//! Payment Gateway - inter-bank transfers over two-phase commit.
//!
//! A gateway coordinates transfers between independent bank services, each
//! owning its accounts exclusively. One logical transfer is a debit leg at
//! the sender bank and a credit leg at the receiver bank, driven through
//! Prepare / Commit / Abort.
//!
//! # Modules
//!
//! - [`money`] - Two-decimal currency amount
//! - [`proto`] - Wire types and the structured [`proto::ErrorKind`]
//! - [`ledger`] - Per-bank account table storage
//! - [`bank`] - Participant state machine, idempotency journal, HTTP surface
//! - [`gateway`] - Transfer coordinator, bank registry, users and tokens
//! - [`txid`] - Monotonic transaction ID service
//! - [`client`] - Offline queue and retry layer
//! - [`status`] - Administrative up/down switch
//! - [`rpc`] - JSON-over-HTTP calls with timeouts
//! - [`config`] / [`logging`] - Ambient setup shared by the binaries

pub mod bank;
pub mod cli;
pub mod client;
pub mod config;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod proto;
pub mod rpc;
pub mod status;
pub mod txid;

pub use bank::Bank;
pub use gateway::TransferCoordinator;
pub use money::Amount;
pub use proto::{ErrorKind, Leg, Phase, TransferRequest};
pub use status::ServiceStatus;
