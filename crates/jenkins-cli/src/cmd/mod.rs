pub mod build;
pub mod notify;

use std::future::Future;
use std::io;

use anyhow::{Context, Result};
use jenkins_core::interrupt::{self, Interrupt, InterruptHandle};
use jenkins_core::FailureReason;
use tokio::runtime::Runtime;

/// A runtime plus an [`Interrupt`] that fires on Ctrl-C.
///
/// The build future keeps running after the signal so it can cancel or stop
/// the remote build before returning. A second Ctrl-C exits at once.
pub fn runtime_with_interrupt() -> Result<(Runtime, Interrupt)> {
    let rt = Runtime::new().context("failed to start tokio runtime")?;
    let (handle, interrupt) = interrupt::channel();
    rt.spawn(async move {
        if relay_signals(tokio::signal::ctrl_c, handle).await {
            std::process::exit(FailureReason::Interrupted.exit_code());
        }
    });
    Ok((rt, interrupt))
}

/// Raise `handle` on the first signal. Returns `true` once a second signal
/// arrives while cleanup is still running.
async fn relay_signals<F, Fut>(mut signal: F, handle: InterruptHandle) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if signal().await.is_err() {
        return false;
    }
    tracing::warn!("interrupted, cleaning up the remote build (Ctrl-C again to exit now)");
    handle.interrupt();

    if signal().await.is_err() {
        return false;
    }
    tracing::warn!("interrupted again, exiting without cleanup");
    true
}
