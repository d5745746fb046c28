//! # outpost_items - Item Subsystem
//!
//! Owns every physical item instance of the world server:
//! - **Lifecycle**: create, restore, split and (recursively) delete items
//! - **Transfers**: move items and quantities between critters, map tiles
//!   and containers
//! - **Radio**: channel- and scope-filtered text broadcast through
//!   radio-capable items
//! - **Statistics**: live instance counts per prototype
//!
//! Critters, maps, sessions and scripts are collaborators reached through
//! the traits in [`world`].
//!
//! ## Example
//!
//! ```ignore
//! use outpost_items::prelude::*;
//!
//! let items = ItemManager::new(protos, critters, maps);
//! let stimpak = items.add_item_critter(&*critter, ProtoId::from_name("stimpak"), 10)?;
//! let part = items.split_item(&stimpak, 4)?;
//! items.move_item_to_critter(&part, 4, &*other);
//! ```

pub mod config;
pub mod error;
pub mod holder;
pub mod item;
pub mod manager;
pub mod radio;
pub mod registry;
pub mod release;
pub mod statistics;
pub mod transfer;
pub mod world;

pub use config::{ItemManagerConfig, RadioConfig};
pub use error::{ItemError, ItemResult};
pub use holder::Destination;
pub use item::{Accessory, Item, ItemRef, ITEM_MAX_CHILDS, SLOT_INVENTORY};
pub use manager::ItemManager;
pub use radio::{is_intersect_zone, RadioMessage, RadioRouter, RADIO_TEXT_COLOR, SAY_RADIO};
pub use registry::{ItemKey, ItemRegistry, ItemStore};
pub use release::DeferredRelease;
pub use statistics::ItemStatistics;
pub use world::{
    Critter, CritterManager, ItemScripts, LocationInfo, Map, MapManager, NoScripts, PlayerSession,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ItemManagerConfig;
    pub use crate::error::{ItemError, ItemResult};
    pub use crate::holder::Destination;
    pub use crate::item::{Accessory, Item, ItemRef};
    pub use crate::manager::ItemManager;
    pub use crate::radio::RadioMessage;
    pub use crate::world::{Critter, CritterManager, ItemScripts, Map, MapManager, PlayerSession};
    pub use outpost_core::prelude::*;
}
