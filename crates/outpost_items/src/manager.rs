//! Item manager
//!
//! Lifecycle of item instances (create, restore, delete, split) and the
//! binding to the global item registry. Transfers between holders live in
//! `transfer.rs`; both extend the same [`ItemManager`].
//!
//! Lock scopes:
//! - the per-item sync lock is held for a whole lifecycle step on that item
//! - the router lock and the statistics lock are taken inside
//!   [`RadioRouter`] and [`ItemStatistics`] for single mutations only
//!
//! Scripting hooks run with the item's sync lock held (it is re-entrant),
//! never with a field lock or service lock held.

use std::sync::Arc;

use outpost_core::{BroadcastScope, ItemId, MapId, Properties, ProtoCatalog, ProtoId, WorldPos};

use crate::config::ItemManagerConfig;
use crate::error::{ItemError, ItemResult};
use crate::item::{Accessory, Item, ItemRef};
use crate::radio::{RadioMessage, RadioRouter};
use crate::registry::{ItemRegistry, ItemStore};
use crate::release::DeferredRelease;
use crate::statistics::ItemStatistics;
use crate::world::{Critter, CritterManager, ItemScripts, MapManager, NoScripts};

/// Item subsystem service
pub struct ItemManager {
    pub(crate) config: ItemManagerConfig,
    pub(crate) protos: Arc<dyn ProtoCatalog>,
    pub(crate) registry: Arc<dyn ItemStore>,
    pub(crate) critters: Arc<dyn CritterManager>,
    pub(crate) maps: Arc<dyn MapManager>,
    pub(crate) scripts: Arc<dyn ItemScripts>,
    pub(crate) radio: RadioRouter,
    pub(crate) stats: ItemStatistics,
    pub(crate) releases: DeferredRelease,
}

impl ItemManager {
    /// Create a manager with an in-process registry, no scripts and the
    /// default configuration
    pub fn new(
        protos: Arc<dyn ProtoCatalog>,
        critters: Arc<dyn CritterManager>,
        maps: Arc<dyn MapManager>,
    ) -> Self {
        let config = ItemManagerConfig::default();
        let radio = RadioRouter::new(Arc::clone(&critters), Arc::clone(&maps), config.radio.clone());
        let stats = ItemStatistics::new(Arc::clone(&protos));

        Self {
            config,
            protos,
            registry: Arc::new(ItemRegistry::new()),
            critters,
            maps,
            scripts: Arc::new(NoScripts),
            radio,
            stats,
            releases: DeferredRelease::new(),
        }
    }

    /// Replace the configuration. Call before any radio registers.
    pub fn with_config(mut self, config: ItemManagerConfig) -> Self {
        self.radio = RadioRouter::new(
            Arc::clone(&self.critters),
            Arc::clone(&self.maps),
            config.radio.clone(),
        );
        self.config = config;
        self
    }

    /// Use an external item store
    pub fn with_registry(mut self, registry: Arc<dyn ItemStore>) -> Self {
        self.registry = registry;
        self
    }

    /// Install scripting hooks
    pub fn with_scripts(mut self, scripts: Arc<dyn ItemScripts>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn config(&self) -> &ItemManagerConfig {
        &self.config
    }

    pub fn radio(&self) -> &RadioRouter {
        &self.radio
    }

    pub fn statistics(&self) -> &ItemStatistics {
        &self.stats
    }

    // ---- Registry binding ----

    /// Look up a live item
    pub fn get_item(&self, id: ItemId) -> Option<ItemRef> {
        self.registry.find(id)
    }

    /// Every registered item
    pub fn get_game_items(&self) -> Vec<ItemRef> {
        self.registry.items()
    }

    /// Number of registered items
    pub fn items_count(&self) -> usize {
        self.registry.count()
    }

    /// Attach every registered item that names this critter as holder to
    /// the critter's inventory (after a restore)
    pub fn set_critter_items(&self, critter: &dyn Critter) {
        for item in self.registry.items() {
            if !item.is_held_by(critter.id()) {
                continue;
            }

            let _sync = item.sync_lock();
            critter.add_item(&item);
            if item.is_radio() {
                self.radio.register(&item, true);
            }
        }
    }

    /// Put every registered item that names this container as holder into
    /// its contents (after a restore)
    pub fn set_container_items(&self, container: &ItemRef) {
        let id = container.id();
        for item in self.registry.items() {
            let inside = matches!(item.accessory(), Accessory::Container { container: holder, .. } if holder == id);
            if inside && !Arc::ptr_eq(container, &item) {
                container.cont_push(&item);
            }
        }
    }

    // ---- Lifecycle ----

    /// Create a fresh item from a prototype.
    ///
    /// `count` is applied to stackable items when non-zero. `props` are laid
    /// over the prototype defaults. The creation hook runs last; if it
    /// destroys the item the call fails with `DestroyedDuringInit`.
    pub fn create_item(&self, pid: ProtoId, count: u32, props: Option<&Properties>) -> ItemResult<ItemRef> {
        let item = self.instantiate(pid, count, props)?;

        {
            let _sync = item.sync_lock();
            self.scripts.on_create(self, &item);
        }

        if item.is_destroyed() {
            log::warn!("Item '{}' destroyed during prototype initialization", item.name());
            return Err(ItemError::DestroyedDuringInit {
                name: item.name().to_string(),
            });
        }

        Ok(item)
    }

    /// Allocate and register an item without running the creation hook
    fn instantiate(&self, pid: ProtoId, count: u32, props: Option<&Properties>) -> ItemResult<ItemRef> {
        let proto = self.protos.get_proto_item(pid).ok_or_else(|| {
            log::error!("Proto item {} not found", pid);
            ItemError::TemplateNotFound(pid)
        })?;

        let item = Arc::new(Item::new(ItemId::NONE, proto));
        if let Some(props) = props {
            item.merge_properties(props);
        }

        let count = if item.is_stackable() && count > 0 { count } else { 1 };
        {
            let _sync = item.sync_lock();
            self.registry.register(&item);
            item.set_count(count);
            self.stats.change(pid, i64::from(count));

            if item.is_radio() {
                self.radio.register(&item, true);
            }
        }

        log::debug!("Created item '{}' ({}), count {}", item.name(), item.id(), count);
        Ok(item)
    }

    /// Rebuild an item from persisted text under its original id.
    ///
    /// On a parse failure, or when the id is already taken by a live item,
    /// nothing is registered. No creation hook runs.
    /// The item is not attached to its holder; see [`set_critter_items`]
    /// and [`set_container_items`].
    ///
    /// [`set_critter_items`]: Self::set_critter_items
    /// [`set_container_items`]: Self::set_container_items
    pub fn restore_item<'a, I>(&self, id: ItemId, pid: ProtoId, entries: I) -> ItemResult<ItemRef>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let proto = self.protos.get_proto_item(pid).ok_or_else(|| {
            log::error!("Proto item {} is not loaded", pid);
            ItemError::TemplateNotFound(pid)
        })?;

        if let Some(existing) = self.registry.find(id) {
            log::error!("Item '{}' ({}) is already registered, restore skipped", existing.name(), id);
            return Err(ItemError::DuplicateId {
                id,
                name: existing.name().to_string(),
            });
        }

        let item = Arc::new(Item::new(id, proto));
        if let Err(source) = item.load_from_text(entries) {
            log::error!("Fail to restore properties for item '{}' ({}): {}", item.name(), id, source);
            return Err(ItemError::PropertyRestoreFailed {
                id,
                name: item.name().to_string(),
                source,
            });
        }

        {
            let _sync = item.sync_lock();
            self.registry.register(&item);
            self.stats.change(pid, i64::from(item.count()));
            if item.is_radio() {
                self.radio.register(&item, true);
            }
        }

        Ok(item)
    }

    /// Destroy an item, its children and its contents.
    ///
    /// Repeated or re-entrant calls on an item already being destroyed do
    /// nothing. The instance stays readable (and reports `is_destroyed`)
    /// until [`process_deferred_releases`](Self::process_deferred_releases).
    pub fn delete_item(&self, item: &ItemRef) {
        let _sync = item.sync_lock();

        if !item.begin_destroy() {
            return;
        }

        self.scripts.on_destroy(self, item, true);

        for child in item.take_children() {
            self.delete_item(&child);
        }

        // Detaching can surface new contents, repeat until settled
        while !item.accessory().is_none() || item.cont_is_items() {
            self.erase_item_holder(item);

            for content in item.take_contents() {
                self.delete_item(&content);
            }
        }

        self.stats.change(item.proto_id(), -i64::from(item.count()));

        if item.is_radio() {
            self.radio.register(item, false);
        }

        self.registry.unregister(item);
        item.finish_destroy();
        self.releases.defer(Arc::clone(item));

        log::debug!("Deleted item '{}' ({})", item.name(), item.id());
    }

    /// Split `count` off a stackable item into a new unattached item
    pub fn split_item(&self, item: &ItemRef, count: u32) -> ItemResult<ItemRef> {
        let _sync = item.sync_lock();
        assert!(!item.is_destroyed(), "split of destroyed item {}", item.id());

        if !item.is_stackable() {
            log::warn!("Splitted item '{}' is not stackable, id {}", item.name(), item.id());
            return Err(ItemError::NotStackable {
                id: item.id(),
                name: item.name().to_string(),
            });
        }

        let item_count = item.count();
        if count == 0 || count >= item_count {
            log::warn!(
                "Invalid item '{}' count, id {}, count {}, split count {}",
                item.name(),
                item.id(),
                item_count,
                count
            );
            return Err(ItemError::InvalidSplitCount {
                id: item.id(),
                name: item.name().to_string(),
                count: item_count,
                split: count,
            });
        }

        let props = item.properties();
        let new_item = self.instantiate(item.proto_id(), count, Some(&props)).map_err(|source| {
            log::error!("Create item '{}' fail, count {}", item.name(), count);
            ItemError::CreateFailed {
                name: item.name().to_string(),
                source: Box::new(source),
            }
        })?;
        new_item.set_radio(item.radio());

        self.change_count(item, -i64::from(count));
        Ok(new_item)
    }

    /// Adjust a stack and its prototype statistic together
    pub(crate) fn change_count(&self, item: &ItemRef, delta: i64) {
        assert!(!item.is_destroyed(), "count change of destroyed item {}", item.id());

        let current = i64::from(item.count());
        let count = (current + delta).clamp(1, i64::from(u32::MAX));
        item.set_count(count as u32);
        self.stats.change(item.proto_id(), count - current);
    }

    /// Drop every released item queued by `delete_item`. Call at a point
    /// where no operation still inspects items from the current tick.
    pub fn process_deferred_releases(&self) -> usize {
        let released = self.releases.collect();
        if !released.is_empty() {
            log::debug!("Released {} destroyed items", released.len());
        }
        released.len()
    }

    /// Destroyed items not yet released
    pub fn pending_releases(&self) -> usize {
        self.releases.pending()
    }

    // ---- Radio ----

    pub fn radio_register(&self, item: &ItemRef, add: bool) {
        self.radio.register(item, add);
    }

    pub fn radio_clear(&self) {
        self.radio.clear();
    }

    /// See [`RadioRouter::send_text`]
    pub fn radio_send_text(&self, critter: &dyn Critter, message: RadioMessage<'_>, channels: &mut Vec<u16>) -> usize {
        self.radio.send_text(critter, message, channels)
    }

    /// See [`RadioRouter::send_text_ex`]
    pub fn radio_send_text_ex(
        &self,
        channel: u16,
        scope: BroadcastScope,
        from_map: MapId,
        from_pos: WorldPos,
        message: RadioMessage<'_>,
        intellect: u16,
    ) -> usize {
        self.radio.send_text_ex(channel, scope, from_map, from_pos, message, intellect)
    }

    // ---- Statistics ----

    pub fn change_item_statistics(&self, pid: ProtoId, delta: i64) {
        self.stats.change(pid, delta);
    }

    pub fn get_item_statistics(&self, pid: ProtoId) -> i64 {
        self.stats.get(pid)
    }

    /// Name-sorted text report of live instance counts
    pub fn get_items_statistics(&self) -> String {
        self.stats.report()
    }
}
