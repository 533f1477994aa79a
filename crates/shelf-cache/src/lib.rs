//! Generation-guarded in-memory cache cells.
//!
//! The purpose of this crate is to resolve the classic out-of-order-response
//! race in a client cache: several refreshes for the same cache cell may be
//! in flight at once, and the one that should win is the one that was
//! *started* last, not the one that happens to *complete* last.
//!
//! A [`Slot`] stamps every refresh attempt with a monotonically increasing
//! generation. A completed fetch is committed only if no newer refresh was
//! started in the meantime; otherwise it is silently discarded on arrival.
//! There is no transport-level cancellation, superseded work simply loses
//! the commit race.

mod slot;

pub use slot::{RefreshOutcome, RefreshToken, Slot, Snapshot};
