//! Item holders
//!
//! Three kinds of things can hold an item: a critter, a map tile and a
//! container item. [`Destination`] is where an item is going (attach,
//! find a compatible stack, check if it is already there); [`Holder`] is
//! where an item currently is, resolved from its accessory (detach).

use std::sync::Arc;

use outpost_core::{Hex, ProtoId, StackId};

use crate::item::{Accessory, ItemRef, SLOT_INVENTORY};
use crate::registry::ItemStore;
use crate::world::{Critter, CritterManager, Map, MapManager};

/// Transfer target
#[derive(Clone, Copy)]
pub enum Destination<'a> {
    /// A critter's inventory
    Critter(&'a dyn Critter),
    /// A map tile
    Hex { map: &'a dyn Map, hex: Hex },
    /// One stack of a container item
    Container { container: &'a ItemRef, stack: StackId },
}

impl<'a> Destination<'a> {
    /// Accessory an item gets when attached here
    pub fn accessory(&self) -> Accessory {
        match *self {
            Self::Critter(critter) => Accessory::Critter {
                critter: critter.id(),
                slot: SLOT_INVENTORY,
            },
            Self::Hex { map, hex } => Accessory::Hex { map: map.id(), hex },
            Self::Container { container, stack } => Accessory::Container {
                container: container.id(),
                stack,
            },
        }
    }

    /// Check if the item already sits exactly here
    pub fn holds(&self, item: &ItemRef) -> bool {
        match (*self, item.accessory()) {
            (Self::Critter(critter), Accessory::Critter { critter: id, .. }) => critter.id() == id,
            (dest, current) => dest.accessory() == current,
        }
    }

    /// Existing item of the prototype at this destination
    pub fn find_stack(&self, pid: ProtoId) -> Option<ItemRef> {
        match *self {
            Self::Critter(critter) => critter.get_item_by_proto(pid),
            Self::Hex { map, hex } => map.items().into_iter().find(|item| {
                item.proto_id() == pid
                    && matches!(item.accessory(), Accessory::Hex { hex: at, .. } if at == hex)
            }),
            Self::Container { container, stack } => container.cont_get_item_by_proto(pid, stack),
        }
    }

    /// Place a detached item here
    pub(crate) fn attach(&self, item: &ItemRef) {
        item.set_accessory(self.accessory());
        match *self {
            Self::Critter(critter) => critter.add_item(item),
            Self::Hex { map, hex } => map.add_item(item, hex),
            Self::Container { container, .. } => container.cont_push(item),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match *self {
            Self::Critter(critter) => format!("critter {}", critter.id()),
            Self::Hex { map, hex } => format!("map {} hex {},{}", map.id(), hex.x, hex.y),
            Self::Container { container, stack } => {
                format!("container {} stack {}", container.id(), stack)
            }
        }
    }
}

/// Resolved current holder of an item
pub(crate) enum Holder {
    Critter(Arc<dyn Critter>),
    Map(Arc<dyn Map>),
    Container(ItemRef),
}

impl Holder {
    /// Look up the holder an accessory names; `None` if it is gone
    pub(crate) fn resolve(
        accessory: Accessory,
        critters: &dyn CritterManager,
        maps: &dyn MapManager,
        items: &dyn ItemStore,
    ) -> Option<Self> {
        match accessory {
            Accessory::None => None,
            Accessory::Critter { critter, .. } => critters.get_critter(critter).map(Self::Critter),
            Accessory::Hex { map, .. } => maps.get_map(map).map(Self::Map),
            Accessory::Container { container, .. } => items.find(container).map(Self::Container),
        }
    }

    /// Make the holder drop its reference to the item
    pub(crate) fn detach(&self, item: &ItemRef) {
        match self {
            Self::Critter(critter) => critter.erase_item(item),
            Self::Map(map) => map.erase_item(item),
            Self::Container(container) => {
                container.cont_remove(item);
            }
        }
    }
}
