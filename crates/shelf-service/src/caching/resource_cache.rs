use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shelf_cache::{RefreshOutcome, Snapshot};
use shelf_resources::{
    FetchError, InstanceId, ListResult, ResourceEntry, ResourceKind, ResourceLister,
};

use super::instance::InstanceResourceCache;
use crate::bus::{RefreshBus, Subscription};
use crate::config::CacheConfigs;

/// Front door for instance resource lists.
///
/// Owns one [`InstanceResourceCache`] per live instance, created lazily on
/// first access and bounded by `max_instances` (least recently used wins
/// eviction). All refreshes funnel through here so that the generation guard
/// and the disposed-instance check apply uniformly, no matter whether a
/// refresh was caller-triggered or event-driven.
pub struct ResourceCacheService {
    lister: Arc<dyn ResourceLister>,
    bus: RefreshBus,
    list_timeout: Duration,
    max_instances: usize,

    /// Live instance caches in least-recently-used order, most recent last.
    instances: Mutex<Vec<(InstanceId, Arc<InstanceResourceCache>)>>,
}

impl fmt::Debug for ResourceCacheService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instances = self
            .instances
            .try_lock()
            .map(|instances| instances.len())
            .unwrap_or_default();
        f.debug_struct("ResourceCacheService")
            .field("instances", &instances)
            .field("list_timeout", &self.list_timeout)
            .field("max_instances", &self.max_instances)
            .finish()
    }
}

impl ResourceCacheService {
    pub fn new(lister: Arc<dyn ResourceLister>, bus: RefreshBus, config: &CacheConfigs) -> Self {
        Self {
            lister,
            bus,
            list_timeout: config.list_timeout,
            max_instances: config.max_instances.max(1),
            instances: Mutex::new(Vec::new()),
        }
    }

    /// The bus this service reacts to; producers publish invalidation events
    /// here after mutating an instance's files.
    pub fn bus(&self) -> &RefreshBus {
        &self.bus
    }

    /// Returns the cache for `instance_id`, creating it on first access and
    /// marking it as most recently used.
    fn instance(&self, instance_id: &InstanceId) -> Arc<InstanceResourceCache> {
        let mut instances = self.instances.lock().unwrap();

        if let Some(index) = instances.iter().position(|(id, _)| id == instance_id) {
            let entry = instances.remove(index);
            let cache = Arc::clone(&entry.1);
            instances.push(entry);
            return cache;
        }

        let cache = Arc::new(InstanceResourceCache::new());
        instances.push((instance_id.clone(), Arc::clone(&cache)));

        if instances.len() > self.max_instances {
            let (evicted, _) = instances.remove(0);
            tracing::debug!(instance = %evicted, "evicting least recently used instance cache");
        }

        cache
    }

    /// Whether the registry still maps `instance_id` to this exact cache.
    ///
    /// False once the instance was disposed or evicted, even if a later
    /// access re-created a cache under the same id.
    fn is_current(&self, instance_id: &InstanceId, cache: &Arc<InstanceResourceCache>) -> bool {
        self.instances
            .lock()
            .unwrap()
            .iter()
            .any(|(id, current)| id == instance_id && Arc::ptr_eq(current, cache))
    }

    /// Reads the current snapshot for one (instance, kind) pair.
    ///
    /// A pure read: creates the entry (empty, not loading) if absent and
    /// never triggers I/O.
    pub fn get(&self, instance_id: &InstanceId, kind: ResourceKind) -> Snapshot<ResourceEntry> {
        metric!(counter("resources.access") += 1, "kind" => kind.as_str());
        self.instance(instance_id).slot(kind).snapshot()
    }

    /// Refreshes the list for one (instance, kind) pair.
    ///
    /// Without `force`, an entry that has loaded once and is idle is a warm
    /// hit: the committed snapshot is returned and no new generation starts.
    /// In every other case a fresh generation is begun and the lister is
    /// asked for the current list, superseding any refresh still in flight.
    ///
    /// Resolves to [`RefreshOutcome::Cancelled`] when this call lost the
    /// race: a newer refresh started, or the instance was disposed while
    /// the lister ran. Lister failures are returned as errors and leave the
    /// entry at its last good list.
    pub async fn refresh(
        &self,
        instance_id: &InstanceId,
        kind: ResourceKind,
        force: bool,
    ) -> ListResult<RefreshOutcome<ResourceEntry>> {
        let cache = self.instance(instance_id);
        let slot = cache.slot(kind);

        if !force {
            let snapshot = slot.snapshot();
            if snapshot.has_loaded_once && !snapshot.is_loading {
                return Ok(RefreshOutcome::Fetched(snapshot.items));
            }
        }

        metric!(
            counter("resources.refresh") += 1,
            "kind" => kind.as_str(),
            "forced" => if force { "true" } else { "false" },
        );

        let outcome = slot.refresh_with(self.list(instance_id, kind)).await;

        // The commit (if any) went into this cache; if the instance was
        // disposed or evicted in the meantime the cache is unreachable and
        // this call is reported as having lost the race.
        if !self.is_current(instance_id, &cache) {
            metric!(counter("resources.refresh.cancelled") += 1, "kind" => kind.as_str());
            return Ok(RefreshOutcome::Cancelled);
        }

        match &outcome {
            Ok(RefreshOutcome::Fetched(items)) => {
                tracing::debug!(
                    instance = %instance_id,
                    kind = %kind,
                    count = items.len(),
                    "refreshed resource list"
                );
            }
            Ok(RefreshOutcome::Cancelled) => {
                metric!(counter("resources.refresh.cancelled") += 1, "kind" => kind.as_str());
            }
            Err(error) => {
                metric!(counter("resources.refresh.errors") += 1, "kind" => kind.as_str());
                tracing::warn!(
                    instance = %instance_id,
                    kind = %kind,
                    error = %error,
                    "refreshing resource list failed"
                );
            }
        }

        outcome
    }

    async fn list(&self, instance_id: &InstanceId, kind: ResourceKind) -> ListResult {
        let listing = self.lister.list(instance_id, kind);
        match tokio::time::timeout(self.list_timeout, listing).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.list_timeout)),
        }
    }

    /// Drops all cache entries for `instance_id`.
    ///
    /// Outstanding lister calls are not aborted; their results are discarded
    /// on arrival and the corresponding refresh calls resolve to
    /// [`RefreshOutcome::Cancelled`].
    pub fn dispose(&self, instance_id: &InstanceId) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(index) = instances.iter().position(|(id, _)| id == instance_id) {
            instances.remove(index);
            tracing::debug!(instance = %instance_id, "disposed instance cache");
        }
    }

    /// Subscribes `instance_id` to invalidation events for `kinds`, forcing
    /// a refresh for every kind an event matches.
    ///
    /// This is the standard page wiring: take a [`get`](Self::get) snapshot,
    /// [`refresh`](Self::refresh) once to warm it, then `watch` the kinds on
    /// display and drop the subscription on unmount. Refreshes are spawned
    /// on the current tokio runtime.
    pub fn watch(self: &Arc<Self>, instance_id: &InstanceId, kinds: &[ResourceKind]) -> Subscription {
        let service = Arc::downgrade(self);
        let id = instance_id.clone();
        self.bus.subscribe(instance_id.clone(), kinds, move |matched| {
            let Some(service) = service.upgrade() else {
                return;
            };
            for &kind in matched {
                let service = Arc::clone(&service);
                let id = id.clone();
                tokio::spawn(async move {
                    if let Err(error) = service.refresh(&id, kind, true).await {
                        tracing::warn!(
                            instance = %id,
                            kind = %kind,
                            error = %error,
                            "event-driven refresh failed"
                        );
                    }
                });
            }
        })
    }
}
