//! # outpost_core - Outpost Core Types
//!
//! Value types shared by the world server's services:
//! - **Identifiers**: typed ids for items, prototypes, critters, maps and locations
//! - **Properties**: dynamic per-item property bags with opaque text persistence
//! - **Prototypes**: immutable item templates and the catalog that serves them
//! - **Radio**: broadcast scopes and radio flags
//!
//! Nothing here knows how items move or live; that is `outpost_items`.

pub mod id;
pub mod props;
pub mod proto;
pub mod radio;

pub use id::*;
pub use props::{Properties, PropertyError, PropertyValue};
pub use proto::{ProtoCatalog, ProtoItem, ProtoRegistry, RadioSettings};
pub use radio::{BroadcastScope, RadioFlags, ScopeFilter};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{CritterId, Hex, ItemId, LocationId, MapId, ProtoId, StackId, WorldPos};
    pub use crate::props::{Properties, PropertyError, PropertyValue};
    pub use crate::proto::{ProtoCatalog, ProtoItem, ProtoRegistry, RadioSettings};
    pub use crate::radio::{BroadcastScope, RadioFlags, ScopeFilter};
}
