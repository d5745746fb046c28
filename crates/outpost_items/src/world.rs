//! World collaborators
//!
//! The item service does not own critters, maps, sessions or scripts. It
//! reaches them through these traits; the server supplies the concrete
//! implementations. Implementations must not call back into the item
//! service while holding their own locks.

use std::sync::Arc;

use outpost_core::{CritterId, Hex, ItemId, LocationId, MapId, ProtoId, WorldPos};

use crate::item::{Accessory, ItemRef, SLOT_INVENTORY};
use crate::manager::ItemManager;

/// A mobile actor able to carry items
pub trait Critter: Send + Sync {
    fn id(&self) -> CritterId;

    /// Map the critter stands on (`MapId::NONE` on the global map)
    fn map_id(&self) -> MapId;

    /// Position on the global map
    fn world_pos(&self) -> WorldPos;

    /// Intellect passed along with radio text
    fn intellect(&self) -> u16;

    /// Put an item into the inventory list. The item's accessory is already
    /// set when this is called.
    fn add_item(&self, item: &ItemRef);

    /// Drop an item from the inventory list
    fn erase_item(&self, item: &ItemRef);

    /// Every carried item
    fn items(&self) -> Vec<ItemRef>;

    fn get_item(&self, id: ItemId) -> Option<ItemRef> {
        self.items().into_iter().find(|item| item.id() == id)
    }

    fn get_item_by_proto(&self, pid: ProtoId) -> Option<ItemRef> {
        self.items().into_iter().find(|item| item.proto_id() == pid)
    }

    /// Matching item, preferring the plain inventory over worn slots
    fn get_item_by_proto_inv_priority(&self, pid: ProtoId) -> Option<ItemRef> {
        let items = self.items();
        let in_inventory = items.iter().find(|item| {
            item.proto_id() == pid
                && matches!(item.accessory(), Accessory::Critter { slot, .. } if slot == SLOT_INVENTORY)
        });

        in_inventory
            .or_else(|| items.iter().find(|item| item.proto_id() == pid))
            .cloned()
    }

    /// Total carried quantity of a prototype
    fn count_item_proto(&self, pid: ProtoId) -> u32 {
        self.items()
            .iter()
            .filter(|item| item.proto_id() == pid)
            .map(|item| item.count())
            .sum()
    }
}

/// Critter lookup
pub trait CritterManager: Send + Sync {
    fn get_critter(&self, id: CritterId) -> Option<Arc<dyn Critter>>;

    /// Connected player session of a critter, `None` for NPCs and offline players
    fn get_player(&self, id: CritterId) -> Option<Arc<dyn PlayerSession>>;
}

/// Location a map belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationInfo {
    pub id: LocationId,
    /// Position on the global map
    pub world_pos: WorldPos,
    /// Footprint radius on the global map
    pub radius: u16,
}

/// A local map
pub trait Map: Send + Sync {
    fn id(&self) -> MapId;

    /// Owning location, `None` while the map is being torn down
    fn location(&self) -> Option<LocationInfo>;

    /// Put an item on a tile. The item's accessory is already set.
    fn add_item(&self, item: &ItemRef, hex: Hex);

    /// Drop an item from the map
    fn erase_item(&self, item: &ItemRef);

    /// Every item on the map
    fn items(&self) -> Vec<ItemRef>;

    /// Write radio text onto a tile
    fn set_text(&self, hex: Hex, color: u32, text: &str, unsafe_text: bool, intellect: u16);

    /// Write a templated message onto a tile
    fn set_text_msg(&self, hex: Hex, color: u32, text_msg: u16, num_str: u32);

    /// Write a templated message with lexeme substitution onto a tile
    fn set_text_msg_lex(&self, hex: Hex, color: u32, text_msg: u16, num_str: u32, lexems: &str);
}

/// Map lookup
pub trait MapManager: Send + Sync {
    fn get_map(&self, id: MapId) -> Option<Arc<dyn Map>>;
}

/// Network-facing side of a connected player
pub trait PlayerSession: Send + Sync {
    fn critter_id(&self) -> CritterId;

    /// Map the player stands on
    fn map_id(&self) -> MapId;

    /// Position on the global map
    fn world_pos(&self) -> WorldPos;

    fn send_text(&self, from_item: ItemId, text: &str, say_type: u8, intellect: u16, unsafe_text: bool);

    fn send_text_msg(&self, from_item: ItemId, text_msg: u16, say_type: u8, num_str: u32);

    fn send_text_msg_lex(
        &self,
        from_item: ItemId,
        text_msg: u16,
        say_type: u8,
        num_str: u32,
        lexems: &str,
    );

    /// Record that radio dispatch `seq` reached this session. Returns false
    /// if it already did.
    fn claim_radio_dispatch(&self, seq: u64) -> bool;
}

/// Scripting hooks run on item creation and destruction.
///
/// Hooks may call back into the manager, including `delete_item` on the
/// very item being created or destroyed. The manager re-checks liveness
/// after every hook call.
pub trait ItemScripts: Send + Sync {
    fn on_create(&self, _manager: &ItemManager, _item: &ItemRef) {}

    fn on_destroy(&self, _manager: &ItemManager, _item: &ItemRef, _forced: bool) {}
}

/// Hooks that do nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScripts;

impl ItemScripts for NoScripts {}
