// ── Membership streams ──
//
// Read handles over a service's key-ordered member list.

use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

type Members<T> = Arc<Vec<Arc<T>>>;

/// A consistent view of a membership list that can wait for the next
/// change.
///
/// [`members`](Self::members) stays fixed until the caller moves on with
/// [`next_change`](Self::next_change), so one listing never mixes two
/// membership states.
pub struct MembershipStream<T: Send + Sync + 'static> {
    members: Members<T>,
    receiver: watch::Receiver<Members<T>>,
}

impl<T: Send + Sync + 'static> MembershipStream<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<Members<T>>) -> Self {
        let members = receiver.borrow_and_update().clone();
        Self { members, receiver }
    }

    pub fn members(&self) -> &[Arc<T>] {
        &self.members
    }

    /// Whether membership changed after this view was taken.
    pub fn is_stale(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for membership to change and adopt the new list. `None` once
    /// the owning service is gone.
    pub async fn next_change(&mut self) -> Option<&[Arc<T>]> {
        self.receiver.changed().await.ok()?;
        self.members = self.receiver.borrow_and_update().clone();
        Some(&self.members)
    }

    /// Every later membership list, skipping the one already held.
    pub fn changes(self) -> impl Stream<Item = Members<T>> + Unpin + Send {
        WatchStream::from_changes(self.receiver)
    }
}
