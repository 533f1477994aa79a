//! Process-wide invalidation bus.
//!
//! Anything that mutates an instance's resource files (an import, a finished
//! download, a rename) publishes `(instance, kinds)` once the mutation is
//! durable. Open pages subscribe for the kinds they display and react by
//! forcing a refresh. The bus is what keeps producers of change and
//! currently-open consumers from depending on each other directly.
//!
//! Delivery is fire-and-forget and at-least-once per registered
//! subscription; handlers must be safe to invoke redundantly (forced
//! refreshes are idempotent thanks to the generation guard).

use std::fmt;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use shelf_resources::{InstanceId, ResourceKind};

type Handler = Arc<dyn Fn(&[ResourceKind]) + Send + Sync>;

struct SubscriptionEntry {
    instance_id: InstanceId,
    kinds: Vec<ResourceKind>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: FxHashMap<u64, SubscriptionEntry>,
}

/// The invalidation bus. Cloning shares the underlying registry.
#[derive(Clone, Default)]
pub struct RefreshBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for RefreshBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscriptions = self
            .registry
            .try_lock()
            .map(|registry| registry.entries.len())
            .unwrap_or_default();
        f.debug_struct("RefreshBus")
            .field("subscriptions", &subscriptions)
            .finish()
    }
}

impl RefreshBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies every subscription for `instance_id` whose declared interest
    /// intersects `kinds`; each matching handler receives the intersection.
    ///
    /// Handlers run on the calling thread, outside the registry lock, so a
    /// handler may itself subscribe or publish. If nothing matches this is a
    /// no-op.
    pub fn publish(&self, instance_id: &InstanceId, kinds: &[ResourceKind]) {
        let matched: Vec<(Handler, Vec<ResourceKind>)> = {
            let registry = self.registry.lock().unwrap();
            registry
                .entries
                .values()
                .filter_map(|entry| {
                    if entry.instance_id != *instance_id {
                        return None;
                    }
                    let subset: Vec<ResourceKind> = entry
                        .kinds
                        .iter()
                        .copied()
                        .filter(|kind| kinds.contains(kind))
                        .collect();
                    (!subset.is_empty()).then(|| (Arc::clone(&entry.handler), subset))
                })
                .collect()
        };

        metric!(counter("bus.publish") += 1);
        tracing::trace!(
            instance = %instance_id,
            subscriptions = matched.len(),
            "publishing invalidation event"
        );

        for (handler, subset) in matched {
            handler(&subset);
        }
    }

    /// Registers interest in `kinds` for one instance.
    ///
    /// The handler is invoked with the matching subset of kinds for every
    /// published event that intersects it. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe(
        &self,
        instance_id: InstanceId,
        kinds: &[ResourceKind],
        handler: impl Fn(&[ResourceKind]) + Send + Sync + 'static,
    ) -> Subscription {
        let mut registry = self.registry.lock().unwrap();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.insert(
            id,
            SubscriptionEntry {
                instance_id,
                kinds: kinds.to_vec(),
                handler: Arc::new(handler),
            },
        );
        Subscription {
            id,
            registry: Arc::clone(&self.registry),
        }
    }
}

/// Guard for one bus subscription; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.lock().unwrap().entries.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_handler() -> (Handler, Arc<Mutex<Vec<Vec<ResourceKind>>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let received = Arc::clone(&received);
            Arc::new(move |kinds: &[ResourceKind]| {
                received.lock().unwrap().push(kinds.to_vec());
            }) as Handler
        };
        (handler, received)
    }

    #[test]
    fn routes_by_instance_and_kind() {
        let bus = RefreshBus::new();
        let (handler_a, received_a) = recording_handler();
        let (handler_b, received_b) = recording_handler();

        let _sub_a = bus.subscribe(
            "instance-a".into(),
            &[ResourceKind::Mod, ResourceKind::ResourcePack],
            move |kinds| handler_a(kinds),
        );
        let _sub_b = bus.subscribe("instance-b".into(), &[ResourceKind::Mod], move |kinds| {
            handler_b(kinds)
        });

        bus.publish(&"instance-a".into(), &[ResourceKind::Mod]);

        assert_eq!(*received_a.lock().unwrap(), vec![vec![ResourceKind::Mod]]);
        assert!(received_b.lock().unwrap().is_empty());
    }

    #[test]
    fn handler_receives_the_intersection() {
        let bus = RefreshBus::new();
        let (handler, received) = recording_handler();

        let _sub = bus.subscribe(
            "instance-a".into(),
            &[ResourceKind::Mod, ResourceKind::ShaderPack],
            move |kinds| handler(kinds),
        );

        bus.publish(
            &"instance-a".into(),
            &[ResourceKind::Mod, ResourceKind::World],
        );

        assert_eq!(*received.lock().unwrap(), vec![vec![ResourceKind::Mod]]);
    }

    #[test]
    fn dropping_the_subscription_unsubscribes() {
        let bus = RefreshBus::new();
        let (handler, received) = recording_handler();

        let sub = bus.subscribe("instance-a".into(), &[ResourceKind::Mod], move |kinds| {
            handler(kinds)
        });
        drop(sub);

        bus.publish(&"instance-a".into(), &[ResourceKind::Mod]);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn publish_without_subscribers_is_a_noop() {
        let bus = RefreshBus::new();
        bus.publish(&"instance-a".into(), ResourceKind::ALL);
    }

    #[test]
    fn every_matching_subscription_is_notified() {
        let bus = RefreshBus::new();
        let (handler_1, received_1) = recording_handler();
        let (handler_2, received_2) = recording_handler();

        let _sub_1 = bus.subscribe("instance-a".into(), &[ResourceKind::Mod], move |kinds| {
            handler_1(kinds)
        });
        let _sub_2 = bus.subscribe(
            "instance-a".into(),
            &[ResourceKind::Mod, ResourceKind::ResourcePack],
            move |kinds| handler_2(kinds),
        );

        bus.publish(&"instance-a".into(), &[ResourceKind::Mod]);

        assert_eq!(received_1.lock().unwrap().len(), 1);
        assert_eq!(received_2.lock().unwrap().len(), 1);
    }
}
