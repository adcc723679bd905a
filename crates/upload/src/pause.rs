//! Pause gate checked by the run loop between items.

use tokio::sync::watch;

/// Wait/notify flag: the run loop parks on it while paused and is woken
/// by `resume`, with no polling.
#[derive(Debug)]
pub(crate) struct PauseGate {
    tx: watch::Sender<bool>,
}

impl PauseGate {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Sets the flag. Returns `true` if it changed.
    pub(crate) fn pause(&self) -> bool {
        self.set(true)
    }

    /// Clears the flag and wakes waiters. Returns `true` if it changed.
    pub(crate) fn resume(&self) -> bool {
        self.set(false)
    }

    /// Flips the flag and returns the new value.
    pub(crate) fn toggle(&self) -> bool {
        self.tx.send_modify(|p| *p = !*p);
        self.is_paused()
    }

    pub(crate) fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves immediately when not paused, otherwise on the next resume.
    pub(crate) async fn wait_until_resumed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|paused| !*paused).await;
    }

    fn set(&self, value: bool) -> bool {
        self.tx.send_if_modified(|p| {
            if *p == value {
                false
            } else {
                *p = value;
                true
            }
        })
    }
}
