//! Shared domain types for the Shelf resource cache, and the boundary trait
//! to whatever actually enumerates an instance's resource files.
//!
//! Nothing in this crate performs I/O. The [`ResourceLister`] implementation
//! is provided by the embedding application and is the only place where disk
//! or network access happens.

mod lister;
mod types;

pub use lister::{FetchError, ListResult, ResourceLister};
pub use types::{InstanceId, ResourceEntry, ResourceKind};
