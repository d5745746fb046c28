//! Live instance statistics per prototype
//!
//! Counters live on the prototypes themselves; this service serializes
//! every adjustment under one statistics lock and builds the diagnostic
//! report.

use parking_lot::Mutex;
use std::fmt::Write;
use std::sync::Arc;

use outpost_core::{ProtoCatalog, ProtoId};

/// Instance statistics tracker
pub struct ItemStatistics {
    protos: Arc<dyn ProtoCatalog>,
    lock: Mutex<()>,
}

impl ItemStatistics {
    pub fn new(protos: Arc<dyn ProtoCatalog>) -> Self {
        Self {
            protos,
            lock: Mutex::new(()),
        }
    }

    /// Adjust the live count of a prototype; unknown prototypes are ignored
    pub fn change(&self, pid: ProtoId, delta: i64) {
        let Some(proto) = self.protos.get_proto_item(pid) else {
            log::warn!("Statistics change for unknown proto item {} ({:+})", pid, delta);
            return;
        };

        let _guard = self.lock.lock();
        proto.add_instances(delta);
    }

    /// Live count of a prototype, 0 when unknown
    pub fn get(&self, pid: ProtoId) -> i64 {
        let Some(proto) = self.protos.get_proto_item(pid) else {
            return 0;
        };

        let _guard = self.lock.lock();
        proto.instance_count()
    }

    /// Name-sorted `(name, live count)` pairs for every prototype
    pub fn snapshot(&self) -> Vec<(String, i64)> {
        let mut protos = {
            let _guard = self.lock.lock();
            self.protos
                .proto_items()
                .into_iter()
                .map(|proto| (proto.name().to_string(), proto.instance_count()))
                .collect::<Vec<_>>()
        };

        protos.sort_by(|a, b| a.0.cmp(&b.0));
        protos
    }

    /// Text report of [`snapshot`](Self::snapshot)
    pub fn report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "{:<41}{}", "Name", "Count");
        for (name, count) in self.snapshot() {
            let _ = writeln!(report, "{:<40} {:<20}", name, count);
        }
        report
    }
}
