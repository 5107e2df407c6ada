//! Gateway: transaction coordinator, bank registry and client authentication.

pub mod auth;
pub mod coordinator;
pub mod error;
pub mod participant;
pub mod registry;
pub mod server;

pub use auth::{AuthError, TokenStore, UserStore};
pub use coordinator::{TransferCoordinator, TransferReceipt};
pub use error::{BankRole, FailureCause, LegFailure, TransferError};
pub use participant::{HttpConnector, LocalConnector, Participant, ParticipantConnector};
pub use registry::BankRegistry;
pub use server::GatewayState;
