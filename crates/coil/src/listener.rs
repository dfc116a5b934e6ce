//! Ordered listener storage
//!
//! Springs and spring systems both carry a list of boxed listeners that
//! must be dispatched in registration order and removed by identity.
//! Dispatch takes the list out of its slot so callbacks may borrow the
//! owning object mutably.

use smallvec::SmallVec;

/// Handle identifying one registered listener.
///
/// Returned by `add_listener`; pass it back to `remove_listener` to drop
/// that registration. Ids are unique per listener list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entries<L: ?Sized> = SmallVec<[(ListenerId, Box<L>); 2]>;

/// Insertion-ordered list of boxed listeners with identity-based removal.
pub(crate) struct ListenerRegistry<L: ?Sized> {
    entries: Entries<L>,
    next_id: u64,
    dispatching: bool,
    /// Ids removed while the entries were taken out for dispatch.
    removed_during_dispatch: SmallVec<[ListenerId; 2]>,
    cleared_during_dispatch: bool,
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
            next_id: 0,
            dispatching: false,
            removed_during_dispatch: SmallVec::new(),
            cleared_during_dispatch: false,
        }
    }

    pub fn add(&mut self, listener: Box<L>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Remove one listener; unknown ids are a silent no-op.
    pub fn remove(&mut self, id: ListenerId) {
        if self.dispatching {
            self.removed_during_dispatch.push(id);
        }
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn clear(&mut self) {
        if self.dispatching {
            self.cleared_during_dispatch = true;
        }
        self.entries.clear();
    }

    /// Take the list out for dispatch.
    ///
    /// Returns `None` when a dispatch is already in progress, so a
    /// callback that triggers another notification on the same list does
    /// not recurse into the listeners a second time.
    pub fn begin_dispatch(&mut self) -> Option<Entries<L>> {
        if self.dispatching {
            return None;
        }
        self.dispatching = true;
        Some(std::mem::take(&mut self.entries))
    }

    /// Put the dispatched list back, honoring removals and additions that
    /// happened from inside the callbacks.
    pub fn end_dispatch(&mut self, dispatched: Entries<L>) {
        self.dispatching = false;
        if self.cleared_during_dispatch {
            self.cleared_during_dispatch = false;
            self.removed_during_dispatch.clear();
            return;
        }
        let added = std::mem::replace(&mut self.entries, dispatched);
        if !self.removed_during_dispatch.is_empty() {
            let removed = std::mem::take(&mut self.removed_during_dispatch);
            self.entries
                .retain(|(entry_id, _)| !removed.contains(entry_id));
        }
        self.entries.extend(added);
    }
}
