//! Interrupt handling
//!
//! The first interrupt cancels the run gracefully: reading stops and
//! in-flight records settle. A second interrupt asks the caller to exit at
//! once, for when a store call hangs.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// What the interrupt watcher ended with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupts {
    /// The signal stream ended before a second interrupt
    Exhausted,
    /// A second interrupt arrived; the caller should exit immediately
    Forced,
}

/// Cancel `cancel` on the first signal and return [`Interrupts::Forced`] on the second
pub async fn watch_interrupts<S>(signals: S, cancel: CancellationToken) -> Interrupts
where
    S: Stream<Item = ()>,
{
    futures::pin_mut!(signals);

    if signals.next().await.is_none() {
        return Interrupts::Exhausted;
    }
    warn!("Interrupt received, settling in-flight records (interrupt again to exit now)");
    cancel.cancel();

    if signals.next().await.is_none() {
        return Interrupts::Exhausted;
    }
    warn!("Second interrupt received, exiting without waiting");
    Interrupts::Forced
}

/// Ctrl-C presses as a stream
pub fn ctrl_c_stream() -> impl Stream<Item = ()> {
    futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
    })
}
