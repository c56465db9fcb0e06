use tokio::sync::watch;

/// Owning side of a cancellation pair, held by the caller's session scope.
#[derive(Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

/// Observing side of a cancellation pair. Cheap to clone; pass one into every fetch.
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortHandle {
    /// Create a connected handle/signal pair.
    pub fn new() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx })
    }

    /// Abort every fetch observing a signal from this handle. Idempotent.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Hand out another signal connected to this handle.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl AbortSignal {
    /// A signal that is never aborted.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Dropping the sender freezes the value at `false`.
        drop(tx);
        Self { rx }
    }

    /// Whether the owning handle has aborted.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the handle aborts. Pends forever if the handle is dropped un-aborted.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/abort.rs"]
mod tests;
