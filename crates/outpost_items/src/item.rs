//! Live item instances
//!
//! An [`Item`] is shared as an [`ItemRef`] (`Arc<Item>`). Holders keep
//! non-owning placement references; the registry decides whether an item
//! exists. Once destroyed, an instance stays readable but inert until the
//! last reference drops after the deferred-release safe point.
//!
//! Each item has two locks:
//! - `sync`: re-entrant operation lock held for a whole lifecycle or
//!   transfer step on this item (see [`Item::sync_lock`])
//! - `data`: field storage lock, held only for a single read or write

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use outpost_core::props::{parse_text, to_text};
use outpost_core::{
    CritterId, Hex, ItemId, MapId, Properties, PropertyError, PropertyValue, ProtoId, ProtoItem,
    RadioFlags, RadioSettings, StackId,
};

/// Shared handle to a live item
pub type ItemRef = Arc<Item>;

/// Number of fixed child slots on every item
pub const ITEM_MAX_CHILDS: usize = 5;

/// Critter slot for the plain inventory
pub const SLOT_INVENTORY: u8 = 0;

/// Who currently holds an item, with the holder's reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accessory {
    /// Not placed anywhere
    #[default]
    None,
    /// In a critter's inventory slot
    Critter { critter: CritterId, slot: u8 },
    /// On a map tile
    Hex { map: MapId, hex: Hex },
    /// Inside a container item, in one of its stacks
    Container { container: ItemId, stack: StackId },
}

impl Accessory {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Persisted accessory code
    fn code(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Critter { .. } => 1,
            Self::Hex { .. } => 2,
            Self::Container { .. } => 3,
        }
    }
}

const KEY_COUNT: &str = "Count";
const KEY_ACCESSORY: &str = "Accessory";
const KEY_CRIT_ID: &str = "CritId";
const KEY_CRIT_SLOT: &str = "CritSlot";
const KEY_MAP_ID: &str = "MapId";
const KEY_HEX_X: &str = "HexX";
const KEY_HEX_Y: &str = "HexY";
const KEY_CONTAINER_ID: &str = "ContainerId";
const KEY_CONTAINER_STACK: &str = "ContainerStack";
const KEY_RADIO_CHANNEL: &str = "RadioChannel";
const KEY_RADIO_FLAGS: &str = "RadioFlags";
const KEY_RADIO_SEND: &str = "RadioBroadcastSend";
const KEY_RADIO_RECV: &str = "RadioBroadcastRecv";

/// Flat holder fields as they appear in persisted text
#[derive(Default)]
struct AccessoryFields {
    code: u8,
    critter: CritterId,
    slot: u8,
    map: MapId,
    hex: Hex,
    container: ItemId,
    stack: StackId,
}

impl AccessoryFields {
    fn build(&self) -> Result<Accessory, PropertyError> {
        match self.code {
            0 => Ok(Accessory::None),
            1 => Ok(Accessory::Critter {
                critter: self.critter,
                slot: self.slot,
            }),
            2 => Ok(Accessory::Hex {
                map: self.map,
                hex: self.hex,
            }),
            3 => Ok(Accessory::Container {
                container: self.container,
                stack: self.stack,
            }),
            code => Err(PropertyError::InvalidField {
                key: KEY_ACCESSORY.to_string(),
                reason: format!("unknown accessory code {}", code),
            }),
        }
    }
}

struct ItemData {
    count: u32,
    accessory: Accessory,
    props: Properties,
    radio: RadioSettings,
    contents: Vec<ItemRef>,
    children: [Option<ItemRef>; ITEM_MAX_CHILDS],
}

/// Live item instance
pub struct Item {
    id: AtomicU32,
    proto: Arc<ProtoItem>,
    sync: ReentrantMutex<()>,
    data: RwLock<ItemData>,
    destroying: AtomicBool,
    destroyed: AtomicBool,
}

impl Item {
    /// Stamp a fresh instance from its prototype
    pub(crate) fn new(id: ItemId, proto: Arc<ProtoItem>) -> Self {
        let data = ItemData {
            count: 1,
            accessory: Accessory::None,
            props: proto.properties().clone(),
            radio: proto.radio().copied().unwrap_or_default(),
            contents: Vec::new(),
            children: Default::default(),
        };

        Self {
            id: AtomicU32::new(id.raw()),
            proto,
            sync: ReentrantMutex::new(()),
            data: RwLock::new(data),
            destroying: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Acquire the per-item operation lock.
    ///
    /// Re-entrant: a scripting hook running under this lock may call back
    /// into the item service for the same item on the same thread.
    pub fn sync_lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.sync.lock()
    }

    pub fn id(&self) -> ItemId {
        ItemId::new(self.id.load(Ordering::Acquire))
    }

    pub(crate) fn set_id(&self, id: ItemId) {
        self.id.store(id.raw(), Ordering::Release);
    }

    pub fn proto(&self) -> &Arc<ProtoItem> {
        &self.proto
    }

    pub fn proto_id(&self) -> ProtoId {
        self.proto.id()
    }

    pub fn name(&self) -> &str {
        self.proto.name()
    }

    pub fn is_stackable(&self) -> bool {
        self.proto.is_stackable()
    }

    pub fn is_radio(&self) -> bool {
        self.proto.is_radio()
    }

    /// Stack size (always 1 for non-stackable items)
    pub fn count(&self) -> u32 {
        self.data.read().count
    }

    pub(crate) fn set_count(&self, count: u32) {
        self.data.write().count = count;
    }

    /// Current holder
    pub fn accessory(&self) -> Accessory {
        self.data.read().accessory
    }

    pub(crate) fn set_accessory(&self, accessory: Accessory) {
        self.data.write().accessory = accessory;
    }

    /// Check if this item sits in the given critter's inventory
    pub fn is_held_by(&self, critter: CritterId) -> bool {
        matches!(self.accessory(), Accessory::Critter { critter: c, .. } if c == critter)
    }

    /// Move the item to another slot of the critter holding it.
    ///
    /// Ignored when the item is not held by a critter.
    pub fn set_critter_slot(&self, new_slot: u8) {
        let mut data = self.data.write();
        if let Accessory::Critter { slot, .. } = &mut data.accessory {
            *slot = new_slot;
        }
    }

    /// Snapshot of the property bag
    pub fn properties(&self) -> Properties {
        self.data.read().props.clone()
    }

    pub fn property(&self, key: &str) -> Option<PropertyValue> {
        self.data.read().props.get(key).cloned()
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.data.write().props.set(key, value);
    }

    pub(crate) fn merge_properties(&self, props: &Properties) {
        self.data.write().props.merge(props);
    }

    /// Current radio tuning
    pub fn radio(&self) -> RadioSettings {
        self.data.read().radio
    }

    pub fn set_radio(&self, radio: RadioSettings) {
        self.data.write().radio = radio;
    }

    pub fn radio_channel(&self) -> u16 {
        self.data.read().radio.channel
    }

    pub fn set_radio_channel(&self, channel: u16) {
        self.data.write().radio.channel = channel;
    }

    pub fn set_radio_flags(&self, flags: RadioFlags) {
        self.data.write().radio.flags = flags;
    }

    /// Radio-capable and allowed to transmit
    pub fn radio_is_send_active(&self) -> bool {
        self.is_radio() && self.radio().flags.send_active()
    }

    /// Radio-capable and allowed to receive
    pub fn radio_is_recv_active(&self) -> bool {
        self.is_radio() && self.radio().flags.recv_active()
    }

    /// Destruction has started
    pub fn is_destroying(&self) -> bool {
        self.destroying.load(Ordering::Acquire)
    }

    /// Destruction finished; the instance is inert
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Flag destruction start; false if it was already started or finished
    pub(crate) fn begin_destroy(&self) -> bool {
        if self.is_destroyed() {
            return false;
        }
        !self.destroying.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn finish_destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    // ---- Child slots ----

    pub fn child(&self, index: usize) -> Option<ItemRef> {
        self.data.read().children.get(index).cloned().flatten()
    }

    /// Place or clear a child; out-of-range slots are ignored
    pub fn set_child(&self, index: usize, child: Option<ItemRef>) {
        if let Some(slot) = self.data.write().children.get_mut(index) {
            *slot = child;
        }
    }

    /// Empty every child slot, returning what was there
    pub(crate) fn take_children(&self) -> Vec<ItemRef> {
        let mut data = self.data.write();
        data.children.iter_mut().filter_map(Option::take).collect()
    }

    // ---- Container contents ----

    /// Check if anything is stored inside
    pub fn cont_is_items(&self) -> bool {
        !self.data.read().contents.is_empty()
    }

    /// Contained items, all of them or one stack
    pub fn cont_items(&self, stack: Option<StackId>) -> Vec<ItemRef> {
        let data = self.data.read();
        match stack {
            None => data.contents.clone(),
            Some(stack) => data
                .contents
                .iter()
                .filter(|item| item.container_stack() == Some(stack))
                .cloned()
                .collect(),
        }
    }

    pub fn cont_get_item(&self, id: ItemId) -> Option<ItemRef> {
        self.data
            .read()
            .contents
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// First contained item of a prototype in the given stack
    pub fn cont_get_item_by_proto(&self, pid: ProtoId, stack: StackId) -> Option<ItemRef> {
        self.data
            .read()
            .contents
            .iter()
            .find(|item| item.proto_id() == pid && item.container_stack() == Some(stack))
            .cloned()
    }

    fn container_stack(&self) -> Option<StackId> {
        match self.accessory() {
            Accessory::Container { stack, .. } => Some(stack),
            _ => None,
        }
    }

    pub(crate) fn cont_push(&self, item: &ItemRef) {
        let mut data = self.data.write();
        if !data.contents.iter().any(|held| Arc::ptr_eq(held, item)) {
            data.contents.push(Arc::clone(item));
        }
    }

    pub(crate) fn cont_remove(&self, item: &Item) -> bool {
        let mut data = self.data.write();
        let before = data.contents.len();
        data.contents.retain(|held| !std::ptr::eq(Arc::as_ptr(held), item));
        data.contents.len() != before
    }

    pub(crate) fn take_contents(&self) -> Vec<ItemRef> {
        std::mem::take(&mut self.data.write().contents)
    }

    // ---- Persistence ----

    /// Apply persisted text: holder fields, count, radio tuning and the
    /// property bag (layered over the prototype defaults). Nothing is
    /// changed when any entry fails to parse.
    pub(crate) fn load_from_text<'a, I>(&self, entries: I) -> Result<(), PropertyError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut count = None;
        let mut fields = AccessoryFields::default();
        let mut radio = self.radio();
        let mut props = self.proto.properties().clone();

        for (key, text) in entries {
            match key.as_str() {
                KEY_COUNT => count = Some(parse_text::<u32>(key, text)?),
                KEY_ACCESSORY => fields.code = parse_text(key, text)?,
                KEY_CRIT_ID => fields.critter = parse_text(key, text)?,
                KEY_CRIT_SLOT => fields.slot = parse_text(key, text)?,
                KEY_MAP_ID => fields.map = parse_text(key, text)?,
                KEY_HEX_X => fields.hex.x = parse_text(key, text)?,
                KEY_HEX_Y => fields.hex.y = parse_text(key, text)?,
                KEY_CONTAINER_ID => fields.container = parse_text(key, text)?,
                KEY_CONTAINER_STACK => fields.stack = parse_text(key, text)?,
                KEY_RADIO_CHANNEL => radio.channel = parse_text(key, text)?,
                KEY_RADIO_FLAGS => radio.flags = parse_text(key, text)?,
                KEY_RADIO_SEND => radio.broadcast_send = parse_text(key, text)?,
                KEY_RADIO_RECV => radio.broadcast_recv = parse_text(key, text)?,
                _ => {
                    let value: PropertyValue = parse_text(key, text)?;
                    props.set(key.clone(), value);
                }
            }
        }

        let accessory = fields.build()?;
        let count = match count {
            Some(0) => {
                return Err(PropertyError::InvalidField {
                    key: KEY_COUNT.to_string(),
                    reason: "count must be positive".to_string(),
                })
            }
            Some(count) if self.is_stackable() => count,
            _ => 1,
        };

        let mut data = self.data.write();
        data.count = count;
        data.accessory = accessory;
        data.radio = radio;
        data.props = props;
        Ok(())
    }

    /// Render the instance as persisted text
    pub fn save_to_text(&self) -> BTreeMap<String, String> {
        let data = self.data.read();
        let mut text = data.props.save_to_text();

        text.insert(KEY_COUNT.to_string(), to_text(&data.count));
        text.insert(KEY_ACCESSORY.to_string(), to_text(&data.accessory.code()));
        match data.accessory {
            Accessory::None => {}
            Accessory::Critter { critter, slot } => {
                text.insert(KEY_CRIT_ID.to_string(), to_text(&critter));
                text.insert(KEY_CRIT_SLOT.to_string(), to_text(&slot));
            }
            Accessory::Hex { map, hex } => {
                text.insert(KEY_MAP_ID.to_string(), to_text(&map));
                text.insert(KEY_HEX_X.to_string(), to_text(&hex.x));
                text.insert(KEY_HEX_Y.to_string(), to_text(&hex.y));
            }
            Accessory::Container { container, stack } => {
                text.insert(KEY_CONTAINER_ID.to_string(), to_text(&container));
                text.insert(KEY_CONTAINER_STACK.to_string(), to_text(&stack));
            }
        }

        if self.is_radio() {
            text.insert(KEY_RADIO_CHANNEL.to_string(), to_text(&data.radio.channel));
            text.insert(KEY_RADIO_FLAGS.to_string(), to_text(&data.radio.flags));
            text.insert(KEY_RADIO_SEND.to_string(), to_text(&data.radio.broadcast_send));
            text.insert(KEY_RADIO_RECV.to_string(), to_text(&data.radio.broadcast_recv));
        }

        text
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        f.debug_struct("Item")
            .field("id", &self.id())
            .field("proto", &self.proto.name())
            .field("count", &data.count)
            .field("accessory", &data.accessory)
            .field("contents", &data.contents.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
