// ── Multi-operation join ──
//
// Fan-in for a logical call that launches several asynchronous
// sub-operations. The opener takes one ticket per sub-operation, each
// sub-operation settles its ticket with its own outcome, and `close()`
// resolves once every ticket has been settled. The first error in
// settlement order wins; later errors are discarded and nothing in
// flight is cancelled.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Marker reported when every outstanding ticket was dropped without
/// settling. Error types used with [`JoinGroup::close`] convert from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

struct JoinState<E> {
    pending: usize,
    first_error: Option<E>,
    completion: Option<oneshot::Sender<Result<(), E>>>,
}

impl<E> JoinState<E> {
    fn take_outcome(&mut self) -> Result<(), E> {
        self.first_error.take().map_or(Ok(()), Err)
    }
}

/// A group of sub-operations joined into one outcome.
pub struct JoinGroup<E> {
    state: Arc<Mutex<JoinState<E>>>,
}

impl<E> JoinGroup<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(JoinState {
                pending: 0,
                first_error: None,
                completion: None,
            })),
        }
    }

    /// Register one more sub-operation. The returned ticket must be
    /// settled with [`JoinTicket::decr`] when the sub-operation finishes.
    pub fn incr(&self) -> JoinTicket<E> {
        self.state.lock().pending += 1;
        JoinTicket {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of tickets handed out and not yet settled.
    pub fn pending(&self) -> usize {
        self.state.lock().pending
    }

    /// Close the group and wait for every outstanding ticket.
    ///
    /// Resolves immediately when nothing is pending. If the remaining
    /// tickets are all dropped unsettled the group resolves with
    /// `E::from(Abandoned)` rather than waiting forever.
    pub async fn close(self) -> Result<(), E>
    where
        E: From<Abandoned>,
    {
        let receiver = {
            let mut state = self.state.lock();
            if state.pending == 0 {
                return state.take_outcome();
            }
            let (tx, rx) = oneshot::channel();
            state.completion = Some(tx);
            rx
        };

        // Release the opener's handle so abandonment is observable.
        drop(self);

        receiver.await.unwrap_or_else(|_| Err(E::from(Abandoned)))
    }
}

impl<E> Default for JoinGroup<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Settlement handle for a single sub-operation of a [`JoinGroup`].
#[must_use = "an unsettled ticket keeps its join group pending"]
pub struct JoinTicket<E> {
    state: Arc<Mutex<JoinState<E>>>,
}

impl<E> JoinTicket<E> {
    /// Report this sub-operation's outcome.
    pub fn decr(self, outcome: Result<(), E>) {
        let mut state = self.state.lock();
        state.pending = state.pending.saturating_sub(1);

        if let Err(err) = outcome {
            if state.first_error.is_none() {
                state.first_error = Some(err);
            }
        }

        if state.pending == 0 {
            if let Some(tx) = state.completion.take() {
                let outcome = state.take_outcome();
                // The closer may have been dropped; nobody is left to tell.
                let _ = tx.send(outcome);
            }
        }
    }
}
