//! In-memory world shared by the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use outpost_core::{
    BroadcastScope, CritterId, Hex, ItemId, LocationId, MapId, ProtoCatalog, ProtoId, ProtoItem,
    ProtoRegistry, RadioSettings, WorldPos,
};
use outpost_items::{
    Critter, CritterManager, ItemManager, ItemManagerConfig, ItemRef, ItemScripts, LocationInfo,
    Map, MapManager, PlayerSession,
};

pub const STIMPAK: &str = "stimpak";
pub const KNIFE: &str = "knife";
pub const BAG: &str = "bag";
pub const RADIO: &str = "radio";
pub const TRAP: &str = "trap";

pub fn pid(name: &str) -> ProtoId {
    ProtoId::from_name(name)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---- Critters ----

pub struct MockCritter {
    id: CritterId,
    map: MapId,
    pos: WorldPos,
    items: Mutex<Vec<ItemRef>>,
    lookup_gate: Mutex<Option<Arc<Barrier>>>,
}

impl MockCritter {
    /// Make the next prototype lookup wait on `gate`
    pub fn gate_next_lookup(&self, gate: Arc<Barrier>) {
        *self.lookup_gate.lock() = Some(gate);
    }

    pub fn held(&self) -> Vec<ItemRef> {
        self.items.lock().clone()
    }

    pub fn holds(&self, item: &ItemRef) -> bool {
        self.items.lock().iter().filter(|held| Arc::ptr_eq(held, item)).count() == 1
    }
}

impl Critter for MockCritter {
    fn id(&self) -> CritterId {
        self.id
    }

    fn map_id(&self) -> MapId {
        self.map
    }

    fn world_pos(&self) -> WorldPos {
        self.pos
    }

    fn intellect(&self) -> u16 {
        6
    }

    fn add_item(&self, item: &ItemRef) {
        let mut items = self.items.lock();
        if !items.iter().any(|held| Arc::ptr_eq(held, item)) {
            items.push(Arc::clone(item));
        }
    }

    fn erase_item(&self, item: &ItemRef) {
        self.items.lock().retain(|held| !Arc::ptr_eq(held, item));
    }

    fn items(&self) -> Vec<ItemRef> {
        self.items.lock().clone()
    }

    fn get_item_by_proto(&self, pid: ProtoId) -> Option<ItemRef> {
        let gate = self.lookup_gate.lock().take();
        if let Some(gate) = gate {
            gate.wait();
        }
        self.items.lock().iter().find(|item| item.proto_id() == pid).cloned()
    }
}

// ---- Sessions ----

#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Text { from: ItemId, text: String, say_type: u8 },
    Msg { from: ItemId, text_msg: u16, num_str: u32 },
    MsgLex { from: ItemId, text_msg: u16, num_str: u32, lexems: String },
}

pub struct MockSession {
    critter: CritterId,
    map: MapId,
    pos: WorldPos,
    last_dispatch: AtomicU64,
    received: Mutex<Vec<Received>>,
    pause: Mutex<Option<Arc<Barrier>>>,
}

impl MockSession {
    /// Hold the next text delivery between two waits on `gate`
    pub fn pause_next_text(&self, gate: Arc<Barrier>) {
        *self.pause.lock() = Some(gate);
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().clone()
    }
}

impl PlayerSession for MockSession {
    fn critter_id(&self) -> CritterId {
        self.critter
    }

    fn map_id(&self) -> MapId {
        self.map
    }

    fn world_pos(&self) -> WorldPos {
        self.pos
    }

    fn send_text(&self, from_item: ItemId, text: &str, say_type: u8, _intellect: u16, _unsafe_text: bool) {
        let pause = self.pause.lock().take();
        if let Some(gate) = pause {
            gate.wait();
            gate.wait();
        }
        self.received.lock().push(Received::Text {
            from: from_item,
            text: text.to_string(),
            say_type,
        });
    }

    fn send_text_msg(&self, from_item: ItemId, text_msg: u16, _say_type: u8, num_str: u32) {
        self.received.lock().push(Received::Msg {
            from: from_item,
            text_msg,
            num_str,
        });
    }

    fn send_text_msg_lex(&self, from_item: ItemId, text_msg: u16, _say_type: u8, num_str: u32, lexems: &str) {
        self.received.lock().push(Received::MsgLex {
            from: from_item,
            text_msg,
            num_str,
            lexems: lexems.to_string(),
        });
    }

    fn claim_radio_dispatch(&self, seq: u64) -> bool {
        self.last_dispatch.swap(seq, Ordering::AcqRel) != seq
    }
}

// ---- Maps ----

pub struct MockMap {
    id: MapId,
    location: Option<LocationInfo>,
    items: Mutex<Vec<ItemRef>>,
    texts: Mutex<Vec<(Hex, u32, String)>>,
}

impl MockMap {
    pub fn held(&self) -> Vec<ItemRef> {
        self.items.lock().clone()
    }

    pub fn holds(&self, item: &ItemRef) -> bool {
        self.items.lock().iter().filter(|held| Arc::ptr_eq(held, item)).count() == 1
    }

    /// Text written onto tiles, as `(hex, color, text)`
    pub fn texts(&self) -> Vec<(Hex, u32, String)> {
        self.texts.lock().clone()
    }
}

impl Map for MockMap {
    fn id(&self) -> MapId {
        self.id
    }

    fn location(&self) -> Option<LocationInfo> {
        self.location
    }

    fn add_item(&self, item: &ItemRef, _hex: Hex) {
        let mut items = self.items.lock();
        if !items.iter().any(|held| Arc::ptr_eq(held, item)) {
            items.push(Arc::clone(item));
        }
    }

    fn erase_item(&self, item: &ItemRef) {
        self.items.lock().retain(|held| !Arc::ptr_eq(held, item));
    }

    fn items(&self) -> Vec<ItemRef> {
        self.items.lock().clone()
    }

    fn set_text(&self, hex: Hex, color: u32, text: &str, _unsafe_text: bool, _intellect: u16) {
        self.texts.lock().push((hex, color, text.to_string()));
    }

    fn set_text_msg(&self, hex: Hex, color: u32, text_msg: u16, num_str: u32) {
        self.texts.lock().push((hex, color, format!("msg {} {}", text_msg, num_str)));
    }

    fn set_text_msg_lex(&self, hex: Hex, color: u32, text_msg: u16, num_str: u32, lexems: &str) {
        self.texts
            .lock()
            .push((hex, color, format!("msg {} {} {}", text_msg, num_str, lexems)));
    }
}

// ---- World ----

#[derive(Default)]
pub struct MockWorld {
    critters: Mutex<HashMap<CritterId, Arc<MockCritter>>>,
    players: Mutex<HashMap<CritterId, Arc<MockSession>>>,
    maps: Mutex<HashMap<MapId, Arc<MockMap>>>,
}

impl MockWorld {
    pub fn add_map(&self, id: u32, location: u32, world_pos: WorldPos, radius: u16) -> Arc<MockMap> {
        let map = Arc::new(MockMap {
            id: MapId::new(id),
            location: Some(LocationInfo {
                id: LocationId::new(location),
                world_pos,
                radius,
            }),
            items: Mutex::new(Vec::new()),
            texts: Mutex::new(Vec::new()),
        });
        self.maps.lock().insert(map.id, Arc::clone(&map));
        map
    }

    /// An NPC standing on a map
    pub fn add_critter(&self, id: u32, map: u32, pos: WorldPos) -> Arc<MockCritter> {
        let critter = Arc::new(MockCritter {
            id: CritterId::new(id),
            map: MapId::new(map),
            pos,
            items: Mutex::new(Vec::new()),
            lookup_gate: Mutex::new(None),
        });
        self.critters.lock().insert(critter.id, Arc::clone(&critter));
        critter
    }

    /// A connected player standing on a map
    pub fn add_player(&self, id: u32, map: u32, pos: WorldPos) -> (Arc<MockCritter>, Arc<MockSession>) {
        let critter = self.add_critter(id, map, pos);
        let session = Arc::new(MockSession {
            critter: critter.id,
            map: MapId::new(map),
            pos,
            last_dispatch: AtomicU64::new(0),
            received: Mutex::new(Vec::new()),
            pause: Mutex::new(None),
        });
        self.players.lock().insert(critter.id, Arc::clone(&session));
        (critter, session)
    }

    pub fn remove_critter(&self, id: CritterId) {
        self.critters.lock().remove(&id);
        self.players.lock().remove(&id);
    }
}

impl CritterManager for MockWorld {
    fn get_critter(&self, id: CritterId) -> Option<Arc<dyn Critter>> {
        self.critters
            .lock()
            .get(&id)
            .map(|critter| Arc::clone(critter) as Arc<dyn Critter>)
    }

    fn get_player(&self, id: CritterId) -> Option<Arc<dyn PlayerSession>> {
        self.players
            .lock()
            .get(&id)
            .map(|session| Arc::clone(session) as Arc<dyn PlayerSession>)
    }
}

impl MapManager for MockWorld {
    fn get_map(&self, id: MapId) -> Option<Arc<dyn Map>> {
        self.maps.lock().get(&id).map(|map| Arc::clone(map) as Arc<dyn Map>)
    }
}

// ---- Scripts ----

/// Records hook calls; destroys `TRAP` items as soon as they are created
/// and re-enters `delete_item` from every destroy hook
#[derive(Default)]
pub struct TestScripts {
    created: AtomicUsize,
    destroyed: Mutex<Vec<ItemId>>,
}

impl TestScripts {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    pub fn destroyed(&self) -> Vec<ItemId> {
        self.destroyed.lock().clone()
    }
}

impl ItemScripts for TestScripts {
    fn on_create(&self, manager: &ItemManager, item: &ItemRef) {
        self.created.fetch_add(1, Ordering::AcqRel);
        if item.proto_id() == pid(TRAP) {
            manager.delete_item(item);
        }
    }

    fn on_destroy(&self, manager: &ItemManager, item: &ItemRef, _forced: bool) {
        self.destroyed.lock().push(item.id());
        manager.delete_item(item);
    }
}

// ---- Fixture ----

pub struct Fixture {
    pub world: Arc<MockWorld>,
    pub protos: Arc<ProtoRegistry>,
    pub scripts: Arc<TestScripts>,
    pub items: ItemManager,
}

pub fn radio_settings(channel: u16, recv: BroadcastScope) -> RadioSettings {
    RadioSettings {
        channel,
        broadcast_send: BroadcastScope::WORLD,
        broadcast_recv: recv,
        ..Default::default()
    }
}

pub fn setup() -> Fixture {
    setup_with_config(ItemManagerConfig::default())
}

pub fn setup_with_config(config: ItemManagerConfig) -> Fixture {
    init_logging();

    let protos = Arc::new(ProtoRegistry::new());
    protos.register(ProtoItem::new(STIMPAK).stackable().with_property("Heal", 20i64));
    protos.register(ProtoItem::new(KNIFE).with_property("Damage", 5i64));
    protos.register(ProtoItem::new(BAG));
    protos.register(ProtoItem::new(RADIO).with_radio(radio_settings(5, BroadcastScope::WORLD)));
    protos.register(ProtoItem::new(TRAP));

    let world = Arc::new(MockWorld::default());
    let scripts = Arc::new(TestScripts::default());

    let items = ItemManager::new(
        Arc::clone(&protos) as Arc<dyn ProtoCatalog>,
        Arc::clone(&world) as Arc<dyn CritterManager>,
        Arc::clone(&world) as Arc<dyn MapManager>,
    )
    .with_config(config)
    .with_scripts(Arc::clone(&scripts) as Arc<dyn ItemScripts>);

    Fixture {
        world,
        protos,
        scripts,
        items,
    }
}

impl Fixture {
    /// Sum of counts of registered items of a prototype
    pub fn live_count(&self, name: &str) -> i64 {
        self.items
            .get_game_items()
            .iter()
            .filter(|item| item.proto_id() == pid(name))
            .map(|item| i64::from(item.count()))
            .sum()
    }

    /// Register a radio with custom tuning, held by nobody
    pub fn radio(&self, channel: u16, recv: BroadcastScope) -> ItemRef {
        let radio = self.items.create_item(pid(RADIO), 0, None).unwrap();
        radio.set_radio(radio_settings(channel, recv));
        radio
    }
}
