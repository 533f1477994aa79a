//! Helpers for testing the resource cache and the refresh bus.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all
//!    console output is captured by the test runner.
//!
//!  - [`ManualLister`] calls never complete on their own. A test that starts
//!    a refresh against one must eventually call
//!    [`complete`](ManualLister::complete) for it, or the refresh will wait
//!    forever.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

use shelf_resources::{InstanceId, ListResult, ResourceEntry, ResourceKind, ResourceLister};

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `shelf`
///    crates and mutes everything else.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("shelf_service=trace,shelf_cache=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// Builds a resource entry with the given name and a plausible file path.
pub fn entry(name: &str) -> ResourceEntry {
    ResourceEntry {
        name: name.to_owned(),
        description: format!("{name} description"),
        icon: None,
        file_path: PathBuf::from(format!("/instances/test/resources/{name}.zip")),
        server_origin: false,
    }
}

/// Builds one entry per name, in order.
pub fn entries(names: &[&str]) -> Vec<ResourceEntry> {
    names.iter().copied().map(entry).collect()
}

/// A lister that serves fixed results per (instance, kind) pair.
///
/// Unknown pairs list as successfully empty. Results can be replaced between
/// calls to simulate files appearing, disappearing, or breaking.
#[derive(Debug, Default)]
pub struct StaticLister {
    results: Mutex<BTreeMap<(InstanceId, ResourceKind), ListResult>>,
    calls: AtomicUsize,
}

impl StaticLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets (or replaces) the result served for the given pair.
    pub fn insert(&self, instance_id: impl Into<InstanceId>, kind: ResourceKind, result: ListResult) {
        self.results
            .lock()
            .unwrap()
            .insert((instance_id.into(), kind), result);
    }

    /// How many list calls have been made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ResourceLister for StaticLister {
    fn list(&self, instance_id: &InstanceId, kind: ResourceKind) -> BoxFuture<'static, ListResult> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let result = self
            .results
            .lock()
            .unwrap()
            .get(&(instance_id.clone(), kind))
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { result })
    }
}

/// A lister whose calls complete only when the test says so.
///
/// Every `list` call parks on a channel and is recorded in call order; the
/// test releases them via [`complete`](Self::complete), in whatever order
/// the scenario needs. This is how out-of-order completions are exercised.
#[derive(Debug, Default)]
pub struct ManualLister {
    calls: Mutex<Vec<Option<oneshot::Sender<ListResult>>>>,
}

impl ManualLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of list calls made so far, completed or not.
    pub fn started(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Completes the `index`-th list call (0-based, in call order).
    ///
    /// # Panics
    ///
    /// Panics if that call was never made or was already completed.
    pub fn complete(&self, index: usize, result: ListResult) {
        let sender = self.calls.lock().unwrap()[index]
            .take()
            .expect("lister call completed twice");
        sender.send(result).ok();
    }
}

impl ResourceLister for ManualLister {
    fn list(&self, _instance_id: &InstanceId, _kind: ResourceKind) -> BoxFuture<'static, ListResult> {
        let (sender, receiver) = oneshot::channel();
        self.calls.lock().unwrap().push(Some(sender));
        Box::pin(async move { receiver.await.expect("lister dropped before completion") })
    }
}
