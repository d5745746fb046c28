//! Typed identifiers for world entities
//!
//! All world ids are plain `u32` values handed out by the entity store.
//! Zero is reserved as "none" for every id kind.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved "no entity" id
            pub const NONE: Self = Self(0);

            /// Create an id from its raw value
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw value
            #[inline]
            pub const fn raw(&self) -> u32 {
                self.0
            }

            /// Check if this is the reserved "none" id
            #[inline]
            pub const fn is_none(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

entity_id!(
    /// Item instance id. `ItemId::NONE` marks an instance that is not registered yet.
    ItemId,
    "ItemId"
);
entity_id!(
    /// Mobile actor (player or npc) id
    CritterId,
    "CritterId"
);
entity_id!(
    /// Map id
    MapId,
    "MapId"
);
entity_id!(
    /// Location (group of maps on the global map) id
    LocationId,
    "LocationId"
);
entity_id!(
    /// Sub-slot key separating independent piles inside one container
    StackId,
    "StackId"
);

/// Item prototype id, the 32-bit FNV-1a hash of the prototype name
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtoId(pub u32);

impl ProtoId {
    /// Create a prototype id from a raw hash
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Hash a prototype name
    pub fn from_name(name: &str) -> Self {
        let mut hash = 0x811c_9dc5u32;
        for byte in name.bytes() {
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x0100_0193);
        }
        Self(hash)
    }

    /// Get the raw hash
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtoId({:#010x})", self.0)
    }
}

impl fmt::Display for ProtoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<&str> for ProtoId {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

/// Tile coordinates on a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hex {
    pub x: u16,
    pub y: u16,
}

impl Hex {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Coordinates on the global (world) map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: u16,
    pub y: u16,
}

impl WorldPos {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}
