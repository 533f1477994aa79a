use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{InstanceId, ResourceEntry, ResourceKind};

/// An error produced while listing the resources of an instance.
///
/// Listing is all-or-nothing per call: there is no partial-result contract,
/// a failed call yields no entries at all. The underlying cause is preserved
/// as a rendered message rather than modeled further.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The backing files or the network source could not be read.
    #[error("unreadable source: {0}")]
    Io(String),
    /// The source was read, but its contents could not be parsed.
    #[error("malformed: {0}")]
    Malformed(String),
    /// The listing did not finish within the configured deadline.
    #[error("listing timed out after {0:?}")]
    Timeout(Duration),
}

/// A listing result, containing either the entries or the reason why the
/// list could not be produced.
pub type ListResult<T = Vec<ResourceEntry>> = Result<T, FetchError>;

/// Boundary to whatever actually enumerates an instance's resources.
///
/// Implementations may scan a directory, parse archive metadata, or ask a
/// remote service; from the cache's point of view a call is just a slow,
/// fallible future producing the current ordered list for one
/// (instance, kind) pair.
pub trait ResourceLister: Send + Sync + 'static {
    /// Produce the current ordered list of entries of `kind` for the given
    /// instance.
    fn list(&self, instance_id: &InstanceId, kind: ResourceKind) -> BoxFuture<'static, ListResult>;
}
