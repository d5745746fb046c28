//! Deferred release of destroyed items
//!
//! `delete_item` does not drop the last service-side reference to an item.
//! The instance is queued here and stays valid (and inert through
//! `is_destroyed`) until the server reaches a safe point and collects the
//! queue, after every in-flight operation of the tick is done.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::item::ItemRef;

/// Queue of destroyed items awaiting release
pub struct DeferredRelease {
    sender: Sender<ItemRef>,
    receiver: Receiver<ItemRef>,
}

impl DeferredRelease {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Queue a destroyed item
    pub fn defer(&self, item: ItemRef) {
        // Both ends live in `self`, the channel cannot be disconnected
        let _ = self.sender.send(item);
    }

    /// Number of queued items
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Take everything queued so far
    pub fn collect(&self) -> Vec<ItemRef> {
        self.receiver.try_iter().collect()
    }
}

impl Default for DeferredRelease {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Item;
    use outpost_core::{ItemId, ProtoItem};
    use std::sync::Arc;

    #[test]
    fn test_defer_and_collect() {
        let release = DeferredRelease::new();
        let proto = Arc::new(ProtoItem::new("knife"));
        let item = Arc::new(Item::new(ItemId::new(1), proto));

        release.defer(Arc::clone(&item));
        assert_eq!(release.pending(), 1);
        assert_eq!(Arc::strong_count(&item), 2);

        let released = release.collect();
        assert_eq!(released.len(), 1);
        assert_eq!(release.pending(), 0);

        drop(released);
        assert_eq!(Arc::strong_count(&item), 1);
    }
}
