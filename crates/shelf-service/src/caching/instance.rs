use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use shelf_cache::Slot;
use shelf_resources::{ResourceEntry, ResourceKind};

/// The cache entries of a single instance, one slot per resource kind.
///
/// Slots are created empty and not-loading on first access and live for as
/// long as the owning registry keeps this instance around. They are never
/// shared across instances.
#[derive(Debug, Default)]
pub struct InstanceResourceCache {
    slots: Mutex<FxHashMap<ResourceKind, Arc<Slot<ResourceEntry>>>>,
}

impl InstanceResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot for `kind`, creating it if this is the first access.
    pub fn slot(&self, kind: ResourceKind) -> Arc<Slot<ResourceEntry>> {
        let mut slots = self.slots.lock().unwrap();
        Arc::clone(slots.entry(kind).or_default())
    }
}
