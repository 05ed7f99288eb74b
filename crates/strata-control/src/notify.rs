//! Wake notifier — kicks the background heal loop without waiting on it.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Sends wake events to the background heal loop.
///
/// Delivery never waits: when the channel is already full a wake is
/// pending, and the new one coalesces into it. A busy loop therefore sees
/// at most `capacity` queued sweeps no matter how often it is woken.
#[derive(Debug, Clone)]
pub struct WakeNotifier {
    tx: mpsc::Sender<()>,
}

impl WakeNotifier {
    pub fn new(tx: mpsc::Sender<()>) -> Self {
        Self { tx }
    }

    /// Create a notifier together with the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Queue one wake event unless one is already pending.
    pub fn notify(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => debug!("wake already pending, coalescing"),
            Err(TrySendError::Closed(())) => debug!("wake channel closed, dropping wake event"),
        }
    }
}
