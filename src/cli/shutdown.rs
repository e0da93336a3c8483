use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels `cancellation` on Ctrl-C so the shell can leave its loop and stop the timer on the way
/// out. A hard kill skips this entirely and leaves the last checkpoint on disk.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, shutting down");
            cancellation.cancel();
        }
        Err(e) => warn!("Can't listen for Ctrl-C: {e}"),
    }
}
