//! Ownership transfers
//!
//! Moving an item is detach-then-attach: [`ItemManager::erase_item_holder`]
//! drops it from wherever it is, then a [`Destination`] takes it. Partial
//! moves of a stack split the requested quantity off first. Lookups that
//! miss make the call do nothing rather than fail.

use std::sync::Arc;

use outpost_core::{Hex, ItemId, ProtoId, StackId};

use crate::error::{ItemError, ItemResult};
use crate::holder::{Destination, Holder};
use crate::item::{Accessory, ItemRef};
use crate::manager::ItemManager;
use crate::world::{Critter, Map};

impl ItemManager {
    /// Detach an item from its current holder and clear its accessory.
    ///
    /// A critter-held radio whose critter is gone is put back into the
    /// router so it does not end up orphaned.
    pub fn erase_item_holder(&self, item: &ItemRef) {
        assert!(!item.is_destroyed(), "erase holder of destroyed item {}", item.id());

        let accessory = item.accessory();
        if accessory.is_none() {
            return;
        }

        match Holder::resolve(
            accessory,
            self.critters.as_ref(),
            self.maps.as_ref(),
            self.registry.as_ref(),
        ) {
            Some(holder) => holder.detach(item),
            None => {
                log::debug!("Holder {:?} of item {} is gone", accessory, item.id());
                if matches!(accessory, Accessory::Critter { .. }) && item.is_radio() {
                    self.radio.register(item, true);
                }
            }
        }

        item.set_accessory(Accessory::None);
    }

    /// Move `count` of an item to a destination.
    ///
    /// The whole item moves when `count` covers the stack or the item is not
    /// stackable; otherwise the split-off part moves and the rest stays.
    /// Returns the item that arrived, `None` if nothing moved.
    pub fn move_item(&self, item: &ItemRef, count: u32, dest: Destination<'_>) -> Option<ItemRef> {
        let _sync = item.sync_lock();
        assert!(!item.is_destroyed(), "move of destroyed item {}", item.id());

        if dest.holds(item) {
            return None;
        }
        if let Destination::Container { container, .. } = dest {
            if Arc::ptr_eq(container, item) {
                log::warn!("Item {} can't be put into itself", item.id());
                return None;
            }
        }

        if count >= item.count() || !item.is_stackable() {
            self.erase_item_holder(item);
            dest.attach(item);
            return Some(Arc::clone(item));
        }

        match self.split_item(item, count) {
            Ok(part) => {
                dest.attach(&part);
                Some(part)
            }
            Err(err) => {
                log::warn!("Move of item {} to {} failed: {}", item.id(), dest.describe(), err);
                None
            }
        }
    }

    pub fn move_item_to_critter(&self, item: &ItemRef, count: u32, critter: &dyn Critter) -> Option<ItemRef> {
        self.move_item(item, count, Destination::Critter(critter))
    }

    pub fn move_item_to_hex(&self, item: &ItemRef, count: u32, map: &dyn Map, hex: Hex) -> Option<ItemRef> {
        self.move_item(item, count, Destination::Hex { map, hex })
    }

    pub fn move_item_to_container(
        &self,
        item: &ItemRef,
        count: u32,
        container: &ItemRef,
        stack: StackId,
    ) -> Option<ItemRef> {
        self.move_item(item, count, Destination::Container { container, stack })
    }

    /// Add `count` of a prototype to one stack of a container
    pub fn add_item_container(
        &self,
        container: &ItemRef,
        pid: ProtoId,
        count: u32,
        stack: StackId,
    ) -> ItemResult<ItemRef> {
        assert!(!container.is_destroyed(), "add into destroyed container {}", container.id());
        self.add_item(Destination::Container { container, stack }, pid, count)
    }

    /// Add `count` of a prototype to a critter's inventory
    pub fn add_item_critter(&self, critter: &dyn Critter, pid: ProtoId, count: u32) -> ItemResult<ItemRef> {
        self.add_item(Destination::Critter(critter), pid, count)
    }

    /// Grow a compatible stack at the destination or create new items there.
    /// Returns the grown stack or the last item created.
    fn add_item(&self, dest: Destination<'_>, pid: ProtoId, count: u32) -> ItemResult<ItemRef> {
        if count == 0 {
            log::debug!("Zero count add of proto item {} to {}", pid, dest.describe());
            return Err(ItemError::ZeroCount(pid));
        }

        if let Some(existing) = dest.find_stack(pid) {
            if !existing.is_stackable() {
                return self.add_discrete(dest, pid, existing.name(), count);
            }
            if self.grow_stack(&existing, count) {
                return Ok(existing);
            }
        }

        let proto = self.protos.get_proto_item(pid).ok_or_else(|| {
            log::error!("Proto item {} not found", pid);
            ItemError::TemplateNotFound(pid)
        })?;

        if !proto.is_stackable() {
            return self.add_discrete(dest, pid, proto.name(), count);
        }

        let item = self.create_item(pid, count, None).map_err(|source| {
            log::error!("Create item '{}' fail, count {}", proto.name(), count);
            ItemError::CreateFailed {
                name: proto.name().to_string(),
                source: Box::new(source),
            }
        })?;
        dest.attach(&item);
        Ok(item)
    }

    /// Create up to the configured cap of single items at the destination.
    /// Individual failures are skipped.
    fn add_discrete(&self, dest: Destination<'_>, pid: ProtoId, name: &str, count: u32) -> ItemResult<ItemRef> {
        let max = self.config.max_added_nogroup_items;
        if count > max {
            log::warn!("Add of {} '{}' items capped to {}", count, name, max);
        }

        let mut last = None;
        let mut last_err = None;
        for _ in 0..count.min(max) {
            match self.create_item(pid, 0, None) {
                Ok(item) => {
                    dest.attach(&item);
                    last = Some(item);
                }
                Err(err) => {
                    log::warn!("Create item '{}' for {} fail: {}", name, dest.describe(), err);
                    last_err = Some(err);
                }
            }
        }

        last.ok_or_else(|| ItemError::CreateFailed {
            name: name.to_string(),
            source: Box::new(last_err.unwrap_or(ItemError::ZeroCount(pid))),
        })
    }

    /// Remove up to `count` of a prototype from a critter.
    ///
    /// Removed material is destroyed, or handed to `collected` when given
    /// (split off for a partial stack). Stops early when the critter runs
    /// out; always returns true.
    pub fn sub_item_critter(
        &self,
        critter: &dyn Critter,
        pid: ProtoId,
        count: u32,
        mut collected: Option<&mut Vec<ItemRef>>,
    ) -> bool {
        let mut remaining = count;

        while remaining > 0 {
            let Some(item) = critter.get_item_by_proto_inv_priority(pid) else {
                break;
            };

            let _sync = item.sync_lock();
            if item.is_destroyed() {
                // Deleted by another caller after the lookup, already off the critter
                continue;
            }
            if !item.is_held_by(critter.id()) {
                log::warn!("Critter {} lists item {} it does not hold", critter.id(), item.id());
                break;
            }

            let held = item.count();
            if item.is_stackable() && remaining < held {
                match collected.as_deref_mut() {
                    Some(out) => match self.split_item(&item, remaining) {
                        Ok(part) => out.push(part),
                        Err(err) => log::warn!("Sub of item {} failed: {}", item.id(), err),
                    },
                    None => self.change_count(&item, -i64::from(remaining)),
                }
                break;
            }

            self.erase_item_holder(&item);
            remaining -= held.min(remaining);
            match collected.as_deref_mut() {
                Some(out) => out.push(Arc::clone(&item)),
                None => self.delete_item(&item),
            }
        }

        true
    }

    /// Bring a critter's quantity of a prototype to exactly `count`
    pub fn set_item_critter(&self, critter: &dyn Critter, pid: ProtoId, count: u32) -> bool {
        let current = critter.count_item_proto(pid);

        if current > count {
            self.sub_item_critter(critter, pid, current - count, None)
        } else if current < count {
            self.add_item_critter(critter, pid, count - current).is_ok()
        } else {
            true
        }
    }

    /// Move `count` (0 means all) of a critter's item to another critter
    pub fn move_item_critters(&self, from: &dyn Critter, to: &dyn Critter, item_id: ItemId, count: u32) -> bool {
        let Some(item) = from.get_item(item_id) else {
            return false;
        };
        self.move_quantity(&item, count, Destination::Critter(to))
    }

    /// Move `count` (0 means all) of a critter's item into a container stack
    pub fn move_item_critter_to_cont(
        &self,
        from: &dyn Critter,
        to_cont: &ItemRef,
        item_id: ItemId,
        count: u32,
        stack: StackId,
    ) -> bool {
        let Some(item) = from.get_item(item_id) else {
            return false;
        };
        if Arc::ptr_eq(&item, to_cont) {
            return false;
        }
        self.move_quantity(
            &item,
            count,
            Destination::Container {
                container: to_cont,
                stack,
            },
        )
    }

    /// Move `count` (0 means all) of a contained item to a critter
    pub fn move_item_critter_from_cont(
        &self,
        from_cont: &ItemRef,
        to: &dyn Critter,
        item_id: ItemId,
        count: u32,
    ) -> bool {
        let Some(item) = from_cont.cont_get_item(item_id) else {
            return false;
        };
        self.move_quantity(&item, count, Destination::Critter(to))
    }

    /// Move every item of one container stack into a stack of another container
    pub fn move_items_containers(
        &self,
        from_cont: &ItemRef,
        to_cont: &ItemRef,
        from_stack: StackId,
        to_stack: StackId,
    ) -> bool {
        if !from_cont.cont_is_items() {
            return true;
        }

        let dest = Destination::Container {
            container: to_cont,
            stack: to_stack,
        };
        for item in from_cont.cont_items(Some(from_stack)) {
            if Arc::ptr_eq(&item, to_cont) {
                continue;
            }
            let _sync = item.sync_lock();
            self.erase_item_holder(&item);
            dest.attach(&item);
        }

        true
    }

    /// Move every item of one container stack to a critter
    pub fn move_items_cont_to_critter(&self, from_cont: &ItemRef, to: &dyn Critter, stack: StackId) -> bool {
        if !from_cont.cont_is_items() {
            return true;
        }

        let dest = Destination::Critter(to);
        for item in from_cont.cont_items(Some(stack)) {
            let _sync = item.sync_lock();
            self.erase_item_holder(&item);
            dest.attach(&item);
        }

        true
    }

    /// Bulk-transfer shape shared by the critter/container moves: the whole
    /// item moves when the full stack does, otherwise the quantity goes
    /// onto a found or fresh destination stack.
    ///
    /// At most one item lock is held at a time. The destination stack is
    /// looked up before the source is locked, and the source is released
    /// before the destination grows.
    fn move_quantity(&self, item: &ItemRef, count: u32, dest: Destination<'_>) -> bool {
        let target = dest.find_stack(item.proto_id());
        if target.as_ref().is_some_and(|existing| Arc::ptr_eq(existing, item)) {
            return true;
        }

        let moved = {
            let _sync = item.sync_lock();
            assert!(!item.is_destroyed(), "move of destroyed item {}", item.id());

            let held = item.count();
            let count = if count == 0 || count > held { held } else { count };

            if !item.is_stackable() || held <= count {
                self.erase_item_holder(item);
                dest.attach(item);
                return true;
            }

            self.change_count(item, -i64::from(count));
            count
        };

        if let Some(existing) = target {
            if self.grow_stack(&existing, moved) {
                return true;
            }
        }

        match self.create_item(item.proto_id(), moved, None) {
            Ok(created) => {
                dest.attach(&created);
                true
            }
            Err(err) => {
                log::error!("Create item '{}' fail: {}", item.name(), err);
                // Give the quantity back unless the source went away meanwhile
                let _sync = item.sync_lock();
                if !item.is_destroyed() {
                    self.change_count(item, i64::from(moved));
                }
                false
            }
        }
    }

    /// Add to a live stack under its own lock; false if it was destroyed
    /// after being looked up
    fn grow_stack(&self, stack: &ItemRef, count: u32) -> bool {
        let _sync = stack.sync_lock();
        if stack.is_destroyed() {
            return false;
        }
        self.change_count(stack, i64::from(count));
        true
    }
}
