//! Process-wide in-memory cache, addressed by query key.
//!
//! The store owns one entry per distinct `QueryKey` and is the single
//! source of truth for fetched data. All mutation funnels through the
//! operations here (`write`, `mark_loading`, `mark_error`, `invalidate`,
//! `settle`); subscribers are woken synchronously from inside each of them.
//!
//! Fetch ownership: `mark_loading` hands out a generation-stamped
//! [`FetchClaim`] and is a no-op while the entry is already Loading, so at
//! most one in-flight fetch owns a key at a time. `settle` only lands a
//! result while its claim's generation is still current; `write`,
//! `mark_error` and `invalidate` advance the generation, which orphans any
//! outstanding claim (stale-response guard).

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;
use tracing::debug;

use super::key::QueryKey;
use crate::api::error::ApiError;

/// Lifecycle of a cached query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
  /// Never fetched, or invalidated and awaiting the next subscriber.
  Idle,
  /// A fetch is in flight.
  Loading,
  /// Last fetch landed.
  Success,
  /// Last fetch failed; previous data (if any) is retained.
  Error,
}

type SharedData = Arc<dyn Any + Send + Sync>;

/// Stored state for one query key.
#[derive(Clone)]
pub struct CacheEntry {
  pub status: QueryStatus,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  data: Option<SharedData>,
  generation: u64,
}

impl CacheEntry {
  fn empty() -> Self {
    Self {
      status: QueryStatus::Idle,
      error: None,
      fetched_at: None,
      data: None,
      generation: 0,
    }
  }

  /// Downcast the stored data. Returns None when empty or when the entry
  /// holds a different type (distinct keys should never share a type
  /// mismatch in practice).
  pub fn data<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
    self.data.clone().and_then(|d| d.downcast::<T>().ok())
  }

  pub fn has_data(&self) -> bool {
    self.data.is_some()
  }
}

impl fmt::Debug for CacheEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("status", &self.status)
      .field("error", &self.error)
      .field("fetched_at", &self.fetched_at)
      .field("has_data", &self.has_data())
      .finish_non_exhaustive()
  }
}

/// Ownership token for one in-flight fetch, handed out by `mark_loading`.
#[derive(Debug)]
pub struct FetchClaim {
  key: QueryKey,
  generation: u64,
}

struct Listener {
  id: u64,
  tx: mpsc::UnboundedSender<()>,
}

#[derive(Default)]
struct StoreInner {
  entries: HashMap<QueryKey, CacheEntry>,
  listeners: HashMap<QueryKey, Vec<Listener>>,
  next_listener_id: u64,
}

impl StoreInner {
  fn notify(&self, key: &QueryKey) {
    if let Some(listeners) = self.listeners.get(key) {
      for listener in listeners {
        // Send failure means the subscriber is gone; Drop cleans it up.
        let _ = listener.tx.send(());
      }
    }
  }
}

/// Clonable handle to the process-wide cache.
#[derive(Clone, Default)]
pub struct CacheStore {
  inner: Arc<Mutex<StoreInner>>,
}

impl CacheStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, StoreInner> {
    // A panic while holding the lock leaves consistent-enough state for a
    // read-mostly cache; recover instead of cascading.
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Snapshot of the entry for a key, if it has ever been touched.
  pub fn read(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.lock().entries.get(key).cloned()
  }

  /// Replace the entry's data, flipping it to Success. This is the only
  /// transition into Success apart from `settle`.
  pub fn write<T: Send + Sync + 'static>(&self, key: &QueryKey, data: T) {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
    entry.status = QueryStatus::Success;
    entry.data = Some(Arc::new(data));
    entry.error = None;
    entry.fetched_at = Some(Utc::now());
    entry.generation += 1;
    inner.notify(key);
  }

  /// Flip the entry to Loading and claim the fetch. Returns None while a
  /// fetch is already in flight for this key; the caller must then attach
  /// as a subscriber instead of issuing a second request.
  pub fn mark_loading(&self, key: &QueryKey) -> Option<FetchClaim> {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
    if entry.status == QueryStatus::Loading {
      return None;
    }
    entry.status = QueryStatus::Loading;
    entry.generation += 1;
    let claim = FetchClaim {
      key: key.clone(),
      generation: entry.generation,
    };
    inner.notify(key);
    Some(claim)
  }

  /// Record a failure, keeping the last-known data for stale display.
  pub fn mark_error(&self, key: &QueryKey, error: ApiError) {
    debug!(key = %key, kind = error.label(), "marked error");
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(CacheEntry::empty);
    entry.status = QueryStatus::Error;
    entry.error = Some(error);
    entry.generation += 1;
    inner.notify(key);
  }

  /// Land the result of a claimed fetch. Discarded without effect when the
  /// claim's generation is no longer current (the entry was written,
  /// errored or invalidated while the fetch was in flight).
  pub fn settle<T: Send + Sync + 'static>(&self, claim: FetchClaim, result: Result<T, ApiError>) {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(&claim.key) else {
      return;
    };
    if entry.generation != claim.generation {
      debug!(key = %claim.key, "discarding stale fetch result");
      return;
    }
    match result {
      Ok(data) => {
        entry.status = QueryStatus::Success;
        entry.data = Some(Arc::new(data));
        entry.error = None;
        entry.fetched_at = Some(Utc::now());
      }
      Err(error) => {
        debug!(key = %claim.key, kind = error.label(), "fetch failed");
        entry.status = QueryStatus::Error;
        entry.error = Some(error);
      }
    }
    inner.notify(&claim.key);
  }

  /// Mark every entry whose key matches the predicate as stale. Data is
  /// retained so subscribers keep rendering it until the refetch lands;
  /// in-flight fetches for matched keys are orphaned.
  pub fn invalidate(&self, matches: impl Fn(&QueryKey) -> bool) {
    let mut inner = self.lock();
    let stale: Vec<QueryKey> = inner
      .entries
      .iter()
      .filter(|(key, _)| matches(key))
      .map(|(key, _)| key.clone())
      .collect();
    for key in &stale {
      if let Some(entry) = inner.entries.get_mut(key) {
        entry.status = QueryStatus::Idle;
        entry.generation += 1;
      }
    }
    for key in &stale {
      debug!(key = %key, "invalidated");
      inner.notify(key);
    }
  }

  /// Invalidate a single key.
  pub fn invalidate_key(&self, key: &QueryKey) {
    self.invalidate(|k| k == key);
  }

  /// Register for synchronous wakeups on every state change of a key.
  pub fn subscribe(&self, key: &QueryKey) -> Subscription {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut inner = self.lock();
    let id = inner.next_listener_id;
    inner.next_listener_id += 1;
    inner
      .listeners
      .entry(key.clone())
      .or_default()
      .push(Listener { id, tx });
    Subscription {
      id,
      key: key.clone(),
      rx,
      store: Arc::downgrade(&self.inner),
    }
  }
}

/// A live registration on one key. Dropping it unregisters the listener.
pub struct Subscription {
  id: u64,
  key: QueryKey,
  rx: mpsc::UnboundedReceiver<()>,
  store: Weak<Mutex<StoreInner>>,
}

impl Subscription {
  /// Drain pending wakeups. Returns true if the entry changed since the
  /// last poll.
  pub fn poll(&mut self) -> bool {
    let mut woken = false;
    while self.rx.try_recv().is_ok() {
      woken = true;
    }
    woken
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(store) = self.store.upgrade() {
      let mut inner = store.lock().unwrap_or_else(|e| e.into_inner());
      if let Some(listeners) = inner.listeners.get_mut(&self.key) {
        listeners.retain(|l| l.id != self.id);
        if listeners.is_empty() {
          inner.listeners.remove(&self.key);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key() -> QueryKey {
    QueryKey::of("meetings")
  }

  #[test]
  fn test_write_then_read_is_success() {
    let store = CacheStore::new();
    store.write(&key(), vec![1, 2, 3]);

    let entry = store.read(&key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(*entry.data::<Vec<i32>>().unwrap(), vec![1, 2, 3]);
    assert!(entry.fetched_at.is_some());
    assert!(entry.error.is_none());
  }

  #[test]
  fn test_read_unknown_key_is_none() {
    let store = CacheStore::new();
    assert!(store.read(&key()).is_none());
  }

  #[test]
  fn test_mark_loading_claims_once() {
    let store = CacheStore::new();
    let first = store.mark_loading(&key());
    assert!(first.is_some());

    // Second caller while Loading gets no claim: it must coalesce.
    assert!(store.mark_loading(&key()).is_none());

    store.settle(first.unwrap(), Ok::<_, ApiError>(7u32));
    assert!(store.mark_loading(&key()).is_some());
  }

  #[test]
  fn test_settle_success() {
    let store = CacheStore::new();
    let claim = store.mark_loading(&key()).unwrap();
    store.settle(claim, Ok::<_, ApiError>("data".to_string()));

    let entry = store.read(&key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(*entry.data::<String>().unwrap(), "data");
  }

  #[test]
  fn test_settle_error_keeps_previous_data() {
    let store = CacheStore::new();
    store.write(&key(), 41u32);

    let claim = store.mark_loading(&key()).unwrap();
    store.settle(claim, Err::<u32, _>(ApiError::Network("offline".into())));

    let entry = store.read(&key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Error);
    assert!(entry.error.is_some());
    // Stale-while-error: last-known data is still readable.
    assert_eq!(*entry.data::<u32>().unwrap(), 41);
  }

  #[test]
  fn test_invalidate_retains_data() {
    let store = CacheStore::new();
    store.write(&key(), 1u32);
    store.invalidate(|k| k.is_resource("meetings"));

    let entry = store.read(&key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Idle);
    assert_eq!(*entry.data::<u32>().unwrap(), 1);
  }

  #[test]
  fn test_invalidate_matches_by_predicate() {
    let store = CacheStore::new();
    store.write(&QueryKey::of("meetings"), 1u32);
    store.write(&QueryKey::of("briefs"), 2u32);

    store.invalidate(|k| k.is_resource("meetings"));

    assert_eq!(
      store.read(&QueryKey::of("meetings")).unwrap().status,
      QueryStatus::Idle
    );
    assert_eq!(
      store.read(&QueryKey::of("briefs")).unwrap().status,
      QueryStatus::Success
    );
  }

  #[test]
  fn test_invalidate_orphans_in_flight_claim() {
    let store = CacheStore::new();
    let claim = store.mark_loading(&key()).unwrap();

    store.invalidate(|k| k.is_resource("meetings"));
    store.settle(claim, Ok::<_, ApiError>(99u32));

    // The pre-invalidation result must not land.
    let entry = store.read(&key()).unwrap();
    assert_eq!(entry.status, QueryStatus::Idle);
    assert!(!entry.has_data());
  }

  #[test]
  fn test_write_orphans_in_flight_claim() {
    let store = CacheStore::new();
    let claim = store.mark_loading(&key()).unwrap();

    store.write(&key(), 1u32);
    store.settle(claim, Ok::<_, ApiError>(2u32));

    assert_eq!(*store.read(&key()).unwrap().data::<u32>().unwrap(), 1);
  }

  #[test]
  fn test_subscribe_wakes_on_every_transition() {
    let store = CacheStore::new();
    let mut sub = store.subscribe(&key());

    assert!(!sub.poll());

    store.write(&key(), 1u32);
    assert!(sub.poll());
    assert!(!sub.poll());

    store.invalidate(|k| k.is_resource("meetings"));
    assert!(sub.poll());

    store.mark_error(&key(), ApiError::Network("down".into()));
    assert!(sub.poll());
  }

  #[test]
  fn test_dropped_subscription_is_unregistered() {
    let store = CacheStore::new();
    let sub = store.subscribe(&key());
    drop(sub);
    // Writing afterwards must not panic or leak a dead sender.
    store.write(&key(), 1u32);
    assert!(store.lock().listeners.is_empty());
  }
}
