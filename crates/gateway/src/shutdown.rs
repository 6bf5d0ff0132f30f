use std::time::Duration;

use {
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

/// Cancel `token` once a shutdown signal arrives.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        token.cancel();
    });
}

/// Forces the process down if shutdown takes longer than its timeout.
#[derive(Clone, Default)]
pub struct Watchdog {
    disarmed: CancellationToken,
}

impl Watchdog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the countdown. The process exits with status 1 unless
    /// [`Watchdog::disarm`] is called within `timeout`.
    pub fn arm(&self, timeout: Duration) {
        let disarmed = self.disarmed.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = disarmed.cancelled() => {},
                () = tokio::time::sleep(timeout) => {
                    error!(timeout_secs = timeout.as_secs(), "graceful shutdown timed out, forcing exit");
                    std::process::exit(1);
                },
            }
        });
    }

    pub fn disarm(&self) {
        self.disarmed.cancel();
    }

    #[must_use]
    pub fn is_disarmed(&self) -> bool {
        self.disarmed.is_cancelled()
    }
}
