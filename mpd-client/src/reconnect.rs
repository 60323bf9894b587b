use std::time::Duration;

use tracing::{debug, info};

use crate::client::MpdConnection;

impl MpdConnection {
    /// Reconnect until it succeeds, sleeping `interval` after each failed
    /// attempt. [`DEFAULT_RETRY_INTERVAL`](crate::DEFAULT_RETRY_INTERVAL)
    /// suits most hosts.
    ///
    /// Returns `true` at once if already connected. Never gives up; drop the
    /// future or use [`retry_connection_until()`](Self::retry_connection_until)
    /// to stop early.
    pub async fn retry_connection(&mut self, interval: Duration) -> bool {
        self.retry_connection_until(interval, || false).await
    }

    /// Like [`retry_connection()`](Self::retry_connection), but asks
    /// `should_stop` before every attempt and returns `false` once it says
    /// so.
    pub async fn retry_connection_until<F>(&mut self, interval: Duration, mut should_stop: F) -> bool
    where
        F: FnMut() -> bool,
    {
        if self.connected() {
            return true;
        }

        let mut attempt: u32 = 0;
        loop {
            if should_stop() {
                debug!(attempt, "retry cancelled");
                return false;
            }

            attempt += 1;
            match self.connect().await {
                Ok(()) => {
                    info!(attempt, "reconnected successfully");
                    return true;
                }
                Err(e) => {
                    debug!(
                        attempt,
                        error = %e,
                        interval_ms = interval.as_millis(),
                        "connect attempt failed, retrying"
                    );
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }
}
