//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Confirmation wait:
//!     → backoff.rs (delay between receipt polls)
//!     → overall deadline enforced by the submitter (tokio::time::timeout)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - Polling is retried; state-changing submissions never are
//! - Jittered backoff spreads polls from concurrent waits

pub mod backoff;

pub use backoff::PollSchedule;
