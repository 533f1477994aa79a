//! Provides the shared Shelf services and a way to initialize them.
//!
//! [`SharedServices`] wires the refresh bus and the resource cache together
//! according to the provided [`Config`], and configures metrics reporting if
//! a statsd endpoint is set. The embedding launcher creates one of these at
//! startup and hands the pieces to its pages and background jobs.

use std::sync::Arc;

use anyhow::Result;

use shelf_resources::ResourceLister;

use crate::bus::RefreshBus;
use crate::caching::ResourceCacheService;
use crate::config::Config;
use crate::metrics;

pub struct SharedServices {
    pub config: Config,
    pub bus: RefreshBus,
    pub resources: Arc<ResourceCacheService>,
}

impl SharedServices {
    pub fn new(config: Config, lister: Arc<dyn ResourceLister>) -> Result<Self> {
        anyhow::ensure!(
            config.caches.max_instances > 0,
            "caches.max_instances must be at least 1"
        );

        if let Some(statsd) = config.metrics.statsd.as_deref() {
            metrics::configure_statsd(
                &config.metrics.prefix,
                statsd,
                config.metrics.custom_tags.clone(),
            );
        }

        let bus = RefreshBus::new();
        let resources = Arc::new(ResourceCacheService::new(
            lister,
            bus.clone(),
            &config.caches,
        ));

        Ok(Self {
            config,
            bus,
            resources,
        })
    }
}
