//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT / Ctrl-C → Cancellation::trigger
//!
//! Cancellation (cancellation.rs):
//!     trigger → every pending confirmation wait stops
//!             → callers receive UnknownOutcome
//!             → later submissions fail with Cancelled, unsent
//! ```
//!
//! # Design Decisions
//! - Cancelling a wait never claims the transaction failed
//! - A trigger is sticky: waits that start afterwards stop immediately

pub mod cancellation;
pub mod signals;

pub use cancellation::Cancellation;
