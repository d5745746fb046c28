//! Radio broadcast router
//!
//! Keeps the set of live radio-capable items and delivers text to every
//! radio listening on a channel, filtered by broadcast scope.
//!
//! The router lock guards only the listener set. Dispatch copies the set
//! and iterates the copy unlocked, so a radio unregistered mid-dispatch may
//! still hear that one message.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use outpost_core::{BroadcastScope, CritterId, Hex, LocationId, MapId, ScopeFilter, WorldPos};

use crate::config::RadioConfig;
use crate::item::{Accessory, ItemRef};
use crate::world::{Critter, CritterManager, MapManager};

/// Say type tag sessions receive for radio text
pub const SAY_RADIO: u8 = 10;

/// Color of radio text written onto map tiles
pub const RADIO_TEXT_COLOR: u32 = 0xFFFF_FFFE;

/// Payload of a radio message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioMessage<'a> {
    /// Free text
    Text { text: &'a str, unsafe_text: bool },
    /// Templated message
    Msg { text_msg: u16, num_str: u32 },
    /// Templated message with lexeme substitution
    MsgLex {
        text_msg: u16,
        num_str: u32,
        lexems: &'a str,
    },
}

/// Check if two global-map footprints come within `zones` zones of each other
pub fn is_intersect_zone(
    from: WorldPos,
    from_radius: u16,
    to: WorldPos,
    to_radius: u16,
    zones: u16,
    zone_length: u16,
) -> bool {
    let zl = i32::from(zone_length.max(1));
    let zones = i32::from(zones);

    let span = |p: u16, r: u16| {
        let (p, r) = (i32::from(p), i32::from(r));
        ((p - r) / zl, (p + r) / zl)
    };

    let (fx1, fx2) = span(from.x, from_radius);
    let (fy1, fy2) = span(from.y, from_radius);
    let (tx1, tx2) = span(to.x, to_radius);
    let (ty1, ty2) = span(to.y, to_radius);

    let (fx1, fx2, fy1, fy2) = (fx1 - zones, fx2 + zones, fy1 - zones, fy2 + zones);

    fx1 <= tx2 && tx1 <= fx2 && fy1 <= ty2 && ty1 <= fy2
}

/// Origin map of a dispatch, resolved on first need
#[derive(Clone, Copy)]
struct Origin {
    map: MapId,
    location: Option<LocationId>,
}

struct OriginCache<'a> {
    maps: &'a dyn MapManager,
    map_id: MapId,
    resolved: Option<Option<Origin>>,
}

impl<'a> OriginCache<'a> {
    fn new(maps: &'a dyn MapManager, map_id: MapId) -> Self {
        Self {
            maps,
            map_id,
            resolved: None,
        }
    }

    fn get(&mut self) -> Option<Origin> {
        let (maps, map_id) = (self.maps, self.map_id);
        *self.resolved.get_or_insert_with(|| {
            if map_id.is_none() {
                return None;
            }
            let map = maps.get_map(map_id)?;
            Some(Origin {
                map: map.id(),
                location: map.location().map(|loc| loc.id),
            })
        })
    }
}

/// Radio broadcast router
pub struct RadioRouter {
    critters: Arc<dyn CritterManager>,
    maps: Arc<dyn MapManager>,
    config: RadioConfig,
    radios: Mutex<Vec<ItemRef>>,
    dispatch_seq: AtomicU64,
}

impl RadioRouter {
    pub fn new(
        critters: Arc<dyn CritterManager>,
        maps: Arc<dyn MapManager>,
        config: RadioConfig,
    ) -> Self {
        Self {
            critters,
            maps,
            config,
            radios: Mutex::new(Vec::new()),
            dispatch_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Drop every registration (process reset)
    pub fn clear(&self) {
        self.radios.lock().clear();
    }

    /// Add or remove a radio listener. Both directions are idempotent.
    pub fn register(&self, item: &ItemRef, add: bool) {
        let mut radios = self.radios.lock();
        let position = radios.iter().position(|radio| Arc::ptr_eq(radio, item));

        match (add, position) {
            (true, None) => {
                radios.push(Arc::clone(item));
                log::debug!("Radio {} registered on channel {}", item.id(), item.radio_channel());
            }
            (false, Some(index)) => {
                radios.swap_remove(index);
                log::debug!("Radio {} unregistered", item.id());
            }
            _ => {}
        }
    }

    pub fn is_registered(&self, item: &ItemRef) -> bool {
        self.radios.lock().iter().any(|radio| Arc::ptr_eq(radio, item))
    }

    /// Number of registered radios
    pub fn len(&self) -> usize {
        self.radios.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.radios.lock().is_empty()
    }

    /// Transmit through every sending radio a critter carries, once per
    /// channel. Channels already in `channels` are skipped and every channel
    /// used is appended. At most `max_send_channels` channels are dispatched
    /// per call. Returns the number of channels dispatched on.
    pub fn send_text(
        &self,
        critter: &dyn Critter,
        message: RadioMessage<'_>,
        channels: &mut Vec<u16>,
    ) -> usize {
        let mut radios = Vec::new();
        for item in critter.items() {
            if radios.len() >= self.config.max_send_channels {
                break;
            }
            if !item.radio_is_send_active() {
                continue;
            }
            let channel = item.radio_channel();
            if channels.contains(&channel) {
                continue;
            }
            channels.push(channel);
            radios.push(item);
        }

        for radio in &radios {
            let settings = radio.radio();
            self.send_text_ex(
                settings.channel,
                settings.broadcast_send,
                critter.map_id(),
                critter.world_pos(),
                message,
                critter.intellect(),
            );
        }

        radios.len()
    }

    /// Deliver a message to every radio listening on `channel` within
    /// `scope` of the origin. Returns the number of deliveries (player
    /// sessions plus map tiles).
    pub fn send_text_ex(
        &self,
        channel: u16,
        scope: BroadcastScope,
        from_map: MapId,
        from_pos: WorldPos,
        message: RadioMessage<'_>,
        intellect: u16,
    ) -> usize {
        if !scope.is_valid() {
            log::warn!("Radio send on channel {} with invalid scope {:?}", channel, scope);
            return 0;
        }
        if matches!(scope, BroadcastScope::MAP | BroadcastScope::LOCATION) && from_map.is_none() {
            log::debug!("Radio send on channel {} with {:?} scope but no origin map", channel, scope);
            return 0;
        }

        let radios = self.radios.lock().clone();
        let seq = self.dispatch_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let mut origin_cache = OriginCache::new(self.maps.as_ref(), from_map);
        let mut delivered = 0;

        for radio in &radios {
            if radio.is_destroyed() || radio.radio_channel() != channel || !radio.radio_is_recv_active() {
                continue;
            }

            let effective = scope.restrict(radio.radio().broadcast_recv);
            let Some(filter) = effective.filter() else {
                continue;
            };

            let origin = match filter {
                ScopeFilter::Map | ScopeFilter::Location => match origin_cache.get() {
                    Some(origin) => Some(origin),
                    None => continue,
                },
                _ => None,
            };

            let target = Target {
                filter,
                origin,
                from_pos,
                seq,
                message,
                intellect,
            };

            let sent = match radio.accessory() {
                Accessory::Critter { critter, .. } => self.deliver_to_player(radio, critter, &target),
                Accessory::Hex { map, hex } => self.deliver_to_hex(map, hex, &target),
                Accessory::Container { .. } | Accessory::None => false,
            };
            if sent {
                delivered += 1;
            }
        }

        delivered
    }

    fn deliver_to_player(&self, radio: &ItemRef, critter: CritterId, target: &Target<'_>) -> bool {
        let Some(session) = self.critters.get_player(critter) else {
            return false;
        };

        let in_range = match target.filter {
            ScopeFilter::Everyone => true,
            ScopeFilter::Map => target.origin.is_some_and(|origin| origin.map == session.map_id()),
            ScopeFilter::Location => {
                let listener = self
                    .maps
                    .get_map(session.map_id())
                    .and_then(|map| map.location())
                    .map(|loc| loc.id);
                listener.is_some() && listener == target.origin.and_then(|origin| origin.location)
            }
            ScopeFilter::Zone(zones) => is_intersect_zone(
                target.from_pos,
                0,
                session.world_pos(),
                0,
                zones,
                self.config.zone_length,
            ),
        };

        if !in_range || !session.claim_radio_dispatch(target.seq) {
            return false;
        }

        match target.message {
            RadioMessage::Text { text, unsafe_text } => {
                session.send_text(radio.id(), text, SAY_RADIO, target.intellect, unsafe_text)
            }
            RadioMessage::Msg { text_msg, num_str } => {
                session.send_text_msg(radio.id(), text_msg, SAY_RADIO, num_str)
            }
            RadioMessage::MsgLex {
                text_msg,
                num_str,
                lexems,
            } => session.send_text_msg_lex(radio.id(), text_msg, SAY_RADIO, num_str, lexems),
        }
        true
    }

    fn deliver_to_hex(&self, map_id: MapId, hex: Hex, target: &Target<'_>) -> bool {
        if target.filter == ScopeFilter::Map && !target.origin.is_some_and(|origin| origin.map == map_id) {
            return false;
        }

        let Some(map) = self.maps.get_map(map_id) else {
            return false;
        };

        let in_range = match target.filter {
            ScopeFilter::Everyone | ScopeFilter::Map => true,
            ScopeFilter::Location => {
                let listener = map.location().map(|loc| loc.id);
                listener.is_some() && listener == target.origin.and_then(|origin| origin.location)
            }
            ScopeFilter::Zone(zones) => map.location().is_some_and(|loc| {
                is_intersect_zone(
                    target.from_pos,
                    0,
                    loc.world_pos,
                    loc.radius,
                    zones,
                    self.config.zone_length,
                )
            }),
        };
        if !in_range {
            return false;
        }

        match target.message {
            RadioMessage::Text { text, unsafe_text } => {
                map.set_text(hex, RADIO_TEXT_COLOR, text, unsafe_text, target.intellect)
            }
            RadioMessage::Msg { text_msg, num_str } => {
                map.set_text_msg(hex, RADIO_TEXT_COLOR, text_msg, num_str)
            }
            RadioMessage::MsgLex {
                text_msg,
                num_str,
                lexems,
            } => map.set_text_msg_lex(hex, RADIO_TEXT_COLOR, text_msg, num_str, lexems),
        }
        true
    }
}

/// Per-listener view of one dispatch
struct Target<'a> {
    filter: ScopeFilter,
    origin: Option<Origin>,
    from_pos: WorldPos,
    seq: u64,
    message: RadioMessage<'a>,
    intellect: u16,
}
