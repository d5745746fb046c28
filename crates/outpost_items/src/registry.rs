//! Item registry
//!
//! The registry owns the canonical existence of every item. `ItemStore` is
//! the narrow contract the item service needs from the server's entity
//! store; `ItemRegistry` is an in-process implementation backed by a
//! generational slot arena, so an `ItemKey` taken before a removal fails
//! checked access instead of resolving to whatever reuses the slot.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use outpost_core::ItemId;

use crate::item::ItemRef;

/// Global item collection
pub trait ItemStore: Send + Sync {
    /// Add an item. An item that already carries an id keeps it; a
    /// transient item (id 0) gets a fresh one. Returns the id in use.
    fn register(&self, item: &ItemRef) -> ItemId;

    /// Remove an item; unknown items are ignored
    fn unregister(&self, item: &ItemRef);

    /// Look up a registered item
    fn find(&self, id: ItemId) -> Option<ItemRef>;

    /// Number of registered items
    fn count(&self) -> usize;

    /// Every registered item, in no particular order
    fn items(&self) -> Vec<ItemRef>;
}

/// Generational handle into the registry arena
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    index: u32,
    generation: u32,
}

impl ItemKey {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemKey({}v{})", self.index, self.generation)
    }
}

struct Slot {
    item: Option<ItemRef>,
    generation: u32,
}

#[derive(Default)]
struct Arena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    by_id: HashMap<ItemId, u32>,
    next_id: u32,
}

impl Arena {
    fn insert(&mut self, item: ItemRef) -> u32 {
        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize].item = Some(item);
            index
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                item: Some(item),
                generation: 0,
            });
            index
        }
    }

    fn remove(&mut self, index: u32) -> Option<ItemRef> {
        let slot = self.slots.get_mut(index as usize)?;
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(index);
        Some(item)
    }

    fn allocate_id(&mut self) -> ItemId {
        loop {
            self.next_id = self.next_id.wrapping_add(1).max(1);
            let id = ItemId::new(self.next_id);
            if !self.by_id.contains_key(&id) {
                return id;
            }
        }
    }
}

/// In-process item registry
#[derive(Default)]
pub struct ItemRegistry {
    arena: RwLock<Arena>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generational key of a registered item
    pub fn key_of(&self, id: ItemId) -> Option<ItemKey> {
        let arena = self.arena.read();
        let index = *arena.by_id.get(&id)?;
        Some(ItemKey {
            index,
            generation: arena.slots[index as usize].generation,
        })
    }

    /// Checked access through a key; stale keys resolve to `None`
    pub fn get(&self, key: ItemKey) -> Option<ItemRef> {
        let arena = self.arena.read();
        let slot = arena.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.item.clone()
    }
}

impl ItemStore for ItemRegistry {
    fn register(&self, item: &ItemRef) -> ItemId {
        let mut arena = self.arena.write();

        let mut id = item.id();
        if id.is_none() {
            id = arena.allocate_id();
            item.set_id(id);
        } else {
            arena.next_id = arena.next_id.max(id.raw());
        }

        if let Some(&index) = arena.by_id.get(&id) {
            // Same id registered again replaces the previous entry
            arena.slots[index as usize].item = Some(Arc::clone(item));
            return id;
        }

        let index = arena.insert(Arc::clone(item));
        arena.by_id.insert(id, index);
        id
    }

    fn unregister(&self, item: &ItemRef) {
        let mut arena = self.arena.write();
        let id = item.id();

        let Some(&index) = arena.by_id.get(&id) else {
            return;
        };
        let same = arena.slots[index as usize]
            .item
            .as_ref()
            .is_some_and(|held| Arc::ptr_eq(held, item));
        if !same {
            return;
        }

        arena.by_id.remove(&id);
        arena.remove(index);
    }

    fn find(&self, id: ItemId) -> Option<ItemRef> {
        let arena = self.arena.read();
        let index = *arena.by_id.get(&id)?;
        arena.slots[index as usize].item.clone()
    }

    fn count(&self) -> usize {
        self.arena.read().by_id.len()
    }

    fn items(&self) -> Vec<ItemRef> {
        self.arena
            .read()
            .slots
            .iter()
            .filter_map(|slot| slot.item.clone())
            .collect()
    }
}
