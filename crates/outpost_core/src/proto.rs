//! Item prototypes
//!
//! A prototype is the immutable template every item instance is stamped
//! from. The only mutable part is the live-instance counter, which the item
//! service updates under its statistics lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::id::ProtoId;
use crate::props::{Properties, PropertyValue};
use crate::radio::{BroadcastScope, RadioFlags};

/// Radio tuning of a radio-capable item; prototypes carry the initial one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RadioSettings {
    /// Channel the radio is tuned to
    pub channel: u16,
    /// Send/receive switches
    pub flags: RadioFlags,
    /// Scope used when this radio transmits
    pub broadcast_send: BroadcastScope,
    /// Widest scope this radio accepts
    pub broadcast_recv: BroadcastScope,
}

/// Item prototype
pub struct ProtoItem {
    id: ProtoId,
    name: String,
    stackable: bool,
    radio: Option<RadioSettings>,
    properties: Properties,
    instance_count: AtomicI64,
}

impl ProtoItem {
    /// Create a non-stackable, non-radio prototype
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ProtoId::from_name(&name),
            name,
            stackable: false,
            radio: None,
            properties: Properties::new(),
            instance_count: AtomicI64::new(0),
        }
    }

    /// Make instances stackable
    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    /// Make instances radio-capable
    pub fn with_radio(mut self, radio: RadioSettings) -> Self {
        self.radio = Some(radio);
        self
    }

    /// Add a default property
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.set(key, value);
        self
    }

    pub fn id(&self) -> ProtoId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_stackable(&self) -> bool {
        self.stackable
    }

    pub fn is_radio(&self) -> bool {
        self.radio.is_some()
    }

    /// Radio defaults, `None` for prototypes without radio capability
    pub fn radio(&self) -> Option<&RadioSettings> {
        self.radio.as_ref()
    }

    /// Default properties copied into every new instance
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Live instance count (sum of stack counts)
    pub fn instance_count(&self) -> i64 {
        self.instance_count.load(Ordering::Acquire)
    }

    /// Adjust the live instance count.
    ///
    /// Callers serialize adjustments with their own statistics lock; the
    /// atomic only makes the counter shareable.
    pub fn add_instances(&self, delta: i64) {
        self.instance_count.fetch_add(delta, Ordering::AcqRel);
    }
}

impl fmt::Debug for ProtoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtoItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("stackable", &self.stackable)
            .field("radio", &self.radio)
            .field("instance_count", &self.instance_count())
            .finish()
    }
}

/// Source of item prototypes
pub trait ProtoCatalog: Send + Sync {
    /// Look up a prototype
    fn get_proto_item(&self, pid: ProtoId) -> Option<Arc<ProtoItem>>;

    /// All loaded prototypes, in no particular order
    fn proto_items(&self) -> Vec<Arc<ProtoItem>>;
}

/// In-memory prototype catalog
#[derive(Default)]
pub struct ProtoRegistry {
    protos: RwLock<HashMap<ProtoId, Arc<ProtoItem>>>,
}

impl ProtoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prototype, replacing any previous one with the same id
    pub fn register(&self, proto: ProtoItem) -> Arc<ProtoItem> {
        let proto = Arc::new(proto);
        self.protos.write().insert(proto.id(), Arc::clone(&proto));
        proto
    }

    pub fn len(&self) -> usize {
        self.protos.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.protos.read().is_empty()
    }
}

impl ProtoCatalog for ProtoRegistry {
    fn get_proto_item(&self, pid: ProtoId) -> Option<Arc<ProtoItem>> {
        self.protos.read().get(&pid).cloned()
    }

    fn proto_items(&self) -> Vec<Arc<ProtoItem>> {
        self.protos.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proto_builder() {
        let proto = ProtoItem::new("stimpak")
            .stackable()
            .with_property("Heal", 20i64);

        assert_eq!(proto.id(), ProtoId::from_name("stimpak"));
        assert!(proto.is_stackable());
        assert!(!proto.is_radio());
        assert_eq!(proto.properties().get("Heal"), Some(&PropertyValue::Int(20)));
    }

    #[test]
    fn test_radio_proto() {
        let proto = ProtoItem::new("walkie_talkie").with_radio(RadioSettings {
            channel: 5,
            broadcast_send: BroadcastScope::MAP,
            ..Default::default()
        });

        assert!(proto.is_radio());
        assert_eq!(proto.radio().map(|r| r.channel), Some(5));
        assert_eq!(proto.radio().map(|r| r.broadcast_recv), Some(BroadcastScope::WORLD));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ProtoRegistry::new();
        registry.register(ProtoItem::new("knife"));

        assert!(registry.get_proto_item(ProtoId::from_name("knife")).is_some());
        assert!(registry.get_proto_item(ProtoId::from_name("spear")).is_none());
        assert_eq!(registry.proto_items().len(), 1);
    }

    #[test]
    fn test_instance_counter() {
        let proto = ProtoItem::new("bottle_caps").stackable();
        proto.add_instances(100);
        proto.add_instances(-40);
        assert_eq!(proto.instance_count(), 60);
    }
}
