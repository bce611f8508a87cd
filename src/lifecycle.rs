//! Process lifecycle: expiry, shutdown, browser launch and the startup banner.

use std::time::Duration;

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{error, info, warn};

use crate::config::ServerConfig;

/// Auto-shutdown delay: zero when kept alive, otherwise `minutes` converted to milliseconds.
pub fn effective_expiry(alive: bool, minutes: u64) -> Duration {
    if alive {
        Duration::ZERO
    } else {
        Duration::from_millis(minutes.saturating_mul(60_000))
    }
}

/// One-shot timer that ends the server after a fixed delay.
///
/// The timer can be cancelled before it fires. A zero delay never fires.
#[derive(Debug)]
pub struct ShutdownTimer {
    expired: CancellationToken,
    cancel: CancellationToken,
}

impl ShutdownTimer {
    /// Start the timer. Must be called from within a tokio runtime when `delay` is non-zero.
    pub fn start(delay: Duration) -> Self {
        let expired = CancellationToken::new();
        let cancel = CancellationToken::new();

        if !delay.is_zero() {
            let expired = expired.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        info!("Expiry of {:?} reached, shutting down", delay);
                        expired.cancel();
                    }
                    _ = cancel.cancelled() => {}
                }
            });
        }

        Self { expired, cancel }
    }

    /// Stop the timer; the expiry future will then never resolve.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_expired(&self) -> bool {
        self.expired.is_cancelled()
    }

    /// Future resolving when the timer fires
    pub fn expired(&self) -> WaitForCancellationFutureOwned {
        self.expired.clone().cancelled_owned()
    }
}

/// Resolve on Ctrl+C, SIGTERM or `expired`, whichever comes first.
pub async fn shutdown_signal(expired: WaitForCancellationFutureOwned) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Shutdown signal received"),
        _ = terminate => info!("Terminate signal received"),
        _ = expired => {}
    }
}

/// Open `url` in the default browser without waiting for it.
pub fn open_browser(url: &str) {
    if let Err(err) = open::that_detached(url) {
        warn!("Failed to open browser: {}. Please navigate to {} manually.", err, url);
    }
}

/// Human-readable startup banner.
pub fn banner(url: &str, config: &ServerConfig) -> String {
    let expiry = if config.expiry.is_zero() {
        "(keep alive)".to_string()
    } else {
        format!("({} mins)", config.expiry.as_secs() / 60)
    };

    let mut options = Vec::new();
    if !config.open_browser {
        options.push("background");
    }
    if config.listing.show_qrcode {
        options.push("qrcode");
    }
    if config.listing.preview {
        options.push("preview");
    }

    let mut banner = format!(
        "server start@ {} {}\nlocal path: {}",
        url,
        expiry,
        config.root_dir.display()
    );
    if !options.is_empty() {
        banner.push_str(&format!("\noptions: {}", options.join(", ")));
    }
    banner
}
