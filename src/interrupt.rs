use std::future::Future;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Watch a stream of interrupt signals.
///
/// The first signal cancels `cancel`, which lets the current session close
/// cleanly. The second resolves this future so the caller can exit without
/// waiting on the service any longer.
pub async fn watch_interrupts<F, Fut>(cancel: CancellationToken, mut next_signal: F) -> io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    next_signal().await?;
    warn!("interrupt received, closing the current session (interrupt again to quit)");
    cancel.cancel();

    next_signal().await?;
    warn!("second interrupt received, exiting without waiting for the service");
    Ok(())
}
