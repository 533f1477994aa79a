//! # Shelf caching infrastructure
//!
//! Every page of the launcher renders the list of resources (mods, resource
//! packs, shader packs, ...) installed in the active instance. Listing those
//! is slow (it means scanning directories and parsing archive metadata), so
//! each list is cached in memory per (instance, kind) pair and refreshed in
//! the background.
//!
//! The moving parts are:
//!
//! - A [`Slot`](shelf_cache::Slot) per (instance, kind): the last committed
//!   list plus a refresh generation. The generation is what prevents a slow,
//!   superseded fetch from overwriting fresher data that arrived out of
//!   order: the refresh that *started* last wins, not the one that happens
//!   to *complete* last.
//! - [`InstanceResourceCache`]: the kind → slot map for one instance,
//!   created lazily on first access and dropped when the instance is
//!   disposed.
//! - [`ResourceCacheService`]: the front door. It owns the per-instance
//!   caches, runs refreshes against the configured
//!   [`ResourceLister`](shelf_resources::ResourceLister), and ties into the
//!   [`RefreshBus`](crate::bus::RefreshBus) so that invalidation events
//!   force targeted refreshes.
//!
//! The cache is purely in-memory and rebuilt on demand; nothing is persisted
//! across restarts. Lister failures never blank a previously committed list,
//! they are surfaced to the caller while the entry keeps its last good
//! snapshot.
//!
//! ## Metrics
//!
//! Collected metrics, tagged with the resource `kind` where applicable:
//!
//! - `resources.access`: snapshot reads.
//! - `resources.refresh`: refreshes that actually hit the lister.
//! - `resources.refresh.cancelled`: refreshes that lost the generation race
//!   or whose instance went away mid-flight.
//! - `resources.refresh.errors`: lister failures.
//! - `bus.publish`: invalidation events published.

mod instance;
mod resource_cache;

pub use instance::InstanceResourceCache;
pub use resource_cache::ResourceCacheService;
