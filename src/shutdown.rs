//! Ctrl+C / SIGTERM handling for a sync run.
//!
//! The first signal cancels the token that [`crate::facebook::GraphClient`]
//! and [`crate::lark::Bitable`] check between pages and batches, so the run
//! still prints a truncated or partial report. A second signal exits at once.

use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq)]
enum SignalAction {
    /// Stop at the next page or batch boundary.
    Drain,
    ForceExit,
}

fn on_signal(run: &CancellationToken) -> SignalAction {
    if run.is_cancelled() {
        SignalAction::ForceExit
    } else {
        run.cancel();
        SignalAction::Drain
    }
}

/// Spawn the signal listener and return the token to hand to the clients.
pub(crate) fn install_signal_handler() -> std::io::Result<CancellationToken> {
    let run = CancellationToken::new();

    #[cfg(unix)]
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let listener = run.clone();
    tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }

            #[cfg(not(unix))]
            {
                if tokio::signal::ctrl_c().await.is_err() {
                    tracing::warn!("Unable to listen for Ctrl+C");
                    return;
                }
            }

            match on_signal(&listener) {
                SignalAction::Drain => {
                    tracing::info!("Stopping sync after the current page or batch (signal again to abort)");
                }
                SignalAction::ForceExit => {
                    tracing::warn!("Sync aborted, no report will be printed");
                    std::process::exit(130);
                }
            }
        }
    });

    Ok(run)
}
