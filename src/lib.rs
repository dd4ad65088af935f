//! Ledger identity client for digital tourist IDs.

pub mod blockchain;
pub mod commitment;
pub mod config;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::LedgerConfig;
pub use identity::{IdentityError, IdentityLedgerClient};
pub use lifecycle::Cancellation;
