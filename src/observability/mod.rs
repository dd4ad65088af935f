//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, one span per facade operation)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Operation ID flows through every event of one facade call
//! - Metrics are cheap (atomic increments) and no-ops until a recorder is installed
//! - Keys and identity payloads are never logged

pub mod logging;
pub mod metrics;
