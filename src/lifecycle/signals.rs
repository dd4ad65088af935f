//! OS signal handling.

use crate::lifecycle::Cancellation;

/// Trigger `cancellation` on the first Ctrl-C / SIGINT.
///
/// Waits that are interrupted this way report an unknown outcome; the
/// submitted transaction may still confirm on the ledger.
pub fn cancel_on_ctrl_c(cancellation: Cancellation) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received; cancelling pending confirmation waits");
                cancellation.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });
}
