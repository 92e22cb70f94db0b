//! Cooperative interruption for a running build.
//!
//! The executor races every network call and every sleep against
//! [`Interrupt::interrupted`], so a signal raised from another task (Ctrl-C,
//! a supervisor timeout) is observed at the next suspension point.

use tokio::sync::watch;

/// Raises the interruption. Dropping it without calling
/// [`interrupt`](InterruptHandle::interrupt) never interrupts.
#[derive(Debug)]
pub struct InterruptHandle {
    tx: watch::Sender<bool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side, passed into the executor.
#[derive(Debug, Clone)]
pub struct Interrupt {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (InterruptHandle, Interrupt) {
    let (tx, rx) = watch::channel(false);
    (InterruptHandle { tx }, Interrupt { rx })
}

impl Interrupt {
    /// An interrupt that never fires.
    pub fn never() -> Self {
        channel().1
    }

    pub fn is_interrupted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the interruption has been raised; pending forever if
    /// the handle was dropped without raising it.
    pub async fn interrupted(&mut self) {
        if self.rx.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
