//! Client-side data synchronization: query-key cache, per-view binders,
//! and mutation reconciliation.
//!
//! Views never talk to the transport client directly for reads. They bind
//! a [`QueryBinder`] to a key; the binder fetches through the shared
//! [`CacheStore`], coalesces with concurrent interest in the same key, and
//! refetches when a [`MutationRunner`] invalidates the key.

mod binder;
mod cache;
mod key;
mod mutation;

pub use binder::QueryBinder;
pub use cache::{CacheEntry, CacheStore, FetchClaim, QueryStatus, Subscription};
pub use key::{KeyPart, QueryKey};
pub use mutation::{InvalidationRule, Mutation, MutationRunner, MutationState};
