//! Radio broadcast scopes and flags
//!
//! Scope codes are ordered numerically and that ordering is load-bearing:
//! when a sender and a listener disagree, the numerically smaller code wins,
//! including across the zone band.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic breadth of a radio message
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BroadcastScope(pub u8);

/// Concrete listener filter a scope resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeFilter {
    /// Every listener on the channel
    Everyone,
    /// Listeners on the origin map
    Map,
    /// Listeners in the origin location
    Location,
    /// Listeners within this many zones of the origin
    Zone(u16),
}

impl BroadcastScope {
    pub const WORLD: Self = Self(0);
    pub const MAP: Self = Self(20);
    pub const LOCATION: Self = Self(40);
    pub const FORCE_ALL: Self = Self(250);

    const ZONE_FIRST: u8 = 101;
    const ZONE_LAST: u8 = 200;

    /// Zone scope reaching `zones` zones around the origin (clamped to 1..=100)
    pub fn zone(zones: u8) -> Self {
        Self(100 + zones.clamp(1, 100))
    }

    /// Check if this is one of the known scope codes
    pub fn is_valid(&self) -> bool {
        matches!(*self, Self::WORLD | Self::MAP | Self::LOCATION | Self::FORCE_ALL) || self.is_zone()
    }

    /// Check if this is a zone scope
    pub fn is_zone(&self) -> bool {
        (Self::ZONE_FIRST..=Self::ZONE_LAST).contains(&self.0)
    }

    /// Zone radius for a zone scope (0 for the narrowest zone)
    pub fn zone_radius(&self) -> Option<u16> {
        self.is_zone().then(|| (self.0 - Self::ZONE_FIRST) as u16)
    }

    /// Combine a requested scope with a listener's receive scope.
    ///
    /// FORCE_ALL on either side wins outright, WORLD defers to the other
    /// side, otherwise the numerically smaller code is taken. A WORLD result
    /// is widened to FORCE_ALL.
    pub fn restrict(self, listener: BroadcastScope) -> BroadcastScope {
        if self == Self::FORCE_ALL || listener == Self::FORCE_ALL {
            return Self::FORCE_ALL;
        }

        let scope = if self == Self::WORLD {
            listener
        } else if listener == Self::WORLD {
            self
        } else {
            self.min(listener)
        };

        if scope == Self::WORLD {
            Self::FORCE_ALL
        } else {
            scope
        }
    }

    /// Resolve to a listener filter, `None` for codes that reach nobody
    pub fn filter(&self) -> Option<ScopeFilter> {
        match *self {
            Self::FORCE_ALL | Self::WORLD => Some(ScopeFilter::Everyone),
            Self::MAP => Some(ScopeFilter::Map),
            Self::LOCATION => Some(ScopeFilter::Location),
            scope => scope.zone_radius().map(ScopeFilter::Zone),
        }
    }
}

impl fmt::Debug for BroadcastScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::WORLD => write!(f, "BroadcastScope::WORLD"),
            Self::MAP => write!(f, "BroadcastScope::MAP"),
            Self::LOCATION => write!(f, "BroadcastScope::LOCATION"),
            Self::FORCE_ALL => write!(f, "BroadcastScope::FORCE_ALL"),
            scope if scope.is_zone() => write!(f, "BroadcastScope::zone({})", scope.0 - 100),
            scope => write!(f, "BroadcastScope({})", scope.0),
        }
    }
}

/// Radio send/receive switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadioFlags(pub u8);

impl RadioFlags {
    pub const NONE: Self = Self(0);
    pub const DISABLE_SEND: Self = Self(0x01);
    pub const DISABLE_RECV: Self = Self(0x02);

    /// Check if all bits of `other` are set
    pub fn contains(&self, other: RadioFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: RadioFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: RadioFlags) {
        self.0 &= !other.0;
    }

    /// Radio may transmit
    pub fn send_active(&self) -> bool {
        !self.contains(Self::DISABLE_SEND)
    }

    /// Radio may receive
    pub fn recv_active(&self) -> bool {
        !self.contains(Self::DISABLE_RECV)
    }
}
