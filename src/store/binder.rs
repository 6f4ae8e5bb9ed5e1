//! Binds a view to a query key and a fetch function.
//!
//! A `QueryBinder<T>` is the per-view handle onto one cache entry: it
//! subscribes to the key, claims the fetch when the entry is absent or
//! Idle, and exposes the entry's data/status/error to the render path.
//! Concurrent binders on the same key coalesce onto the single in-flight
//! fetch owned by whichever binder claimed it first.
//!
//! # Example
//!
//! ```ignore
//! let api = api_client.clone();
//! let mut query = QueryBinder::bind(store, keys::briefs(), move || {
//!     let api = api.clone();
//!     async move { api.list_briefs().await }
//! });
//!
//! // In the event loop tick
//! if query.poll() {
//!     // State changed, re-render
//! }
//!
//! // In render
//! if query.is_loading() { /* spinner */ }
//! if let Some(briefs) = query.data() { /* rows */ }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::cache::{CacheEntry, CacheStore, QueryStatus, Subscription};
use super::key::QueryKey;
use crate::api::error::ApiError;

/// A boxed future resolving to a typed transport result.
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory that creates fetch futures; invoked once per owned fetch.
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Per-view binding of a query key to a fetch function.
pub struct QueryBinder<T> {
  store: CacheStore,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  sub: Subscription,
}

impl<T: Send + Sync + 'static> QueryBinder<T> {
  /// Subscribe to `key` and start fetching if nobody has yet.
  pub fn bind<F, Fut>(store: CacheStore, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let sub = store.subscribe(&key);
    let binder = Self {
      store,
      key,
      fetcher: Box::new(move || Box::pin(fetcher())),
      sub,
    };
    binder.ensure_fetch();
    binder
  }

  /// Switch this binder to a new key (e.g. the search term changed).
  ///
  /// The old key's in-flight fetch, if any, settles under the old key and
  /// is never visible through this binder again; if the old entry was
  /// invalidated meanwhile, the settlement is discarded store-side.
  pub fn rebind<F, Fut>(&mut self, key: QueryKey, fetcher: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if key == self.key {
      return;
    }
    self.sub = self.store.subscribe(&key);
    self.key = key;
    self.fetcher = Box::new(move || Box::pin(fetcher()));
    self.ensure_fetch();
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  fn entry(&self) -> Option<CacheEntry> {
    self.store.read(&self.key)
  }

  /// Current data, possibly stale from a previous fetch.
  pub fn data(&self) -> Option<Arc<T>> {
    self.entry().and_then(|e| e.data::<T>())
  }

  pub fn status(&self) -> QueryStatus {
    self.entry().map(|e| e.status).unwrap_or(QueryStatus::Idle)
  }

  pub fn is_loading(&self) -> bool {
    self.status() == QueryStatus::Loading
  }

  pub fn error(&self) -> Option<ApiError> {
    self.entry().and_then(|e| e.error)
  }

  /// Drain subscription wakeups and re-claim after an invalidation.
  ///
  /// Returns true if the entry changed since the last poll. Call this from
  /// the view's tick handler.
  pub fn poll(&mut self) -> bool {
    let woken = self.sub.poll();
    if self.status() == QueryStatus::Idle {
      self.ensure_fetch();
    }
    woken
  }

  /// Force a refetch of this key, discarding any in-flight result.
  pub fn refetch(&mut self) {
    self.store.invalidate_key(&self.key);
    self.ensure_fetch();
  }

  /// Claim and spawn the fetch when the entry is absent or Idle. A no-op
  /// when data is already present (Success), a fetch is running (Loading),
  /// or the last fetch failed (Error; retry is explicit, never automatic).
  fn ensure_fetch(&self) {
    if let Some(entry) = self.entry() {
      if entry.status != QueryStatus::Idle {
        return;
      }
    }
    let Some(claim) = self.store.mark_loading(&self.key) else {
      // Someone else owns the fetch; our subscription covers the result.
      return;
    };
    let store = self.store.clone();
    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      store.settle(claim, result);
    });
  }
}

impl<T> std::fmt::Debug for QueryBinder<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryBinder")
      .field("key", &self.key)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn counted_fetcher(
    counter: Arc<AtomicU32>,
    value: u32,
  ) -> impl Fn() -> Pin<Box<dyn Future<Output = Result<u32, ApiError>> + Send>> + Send + Sync {
    move || {
      let counter = counter.clone();
      Box::pin(async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
      })
    }
  }

  #[tokio::test]
  async fn test_bind_fetches_and_settles() {
    let store = CacheStore::new();
    let mut query = QueryBinder::bind(store, QueryKey::of("meetings"), || async {
      Ok::<_, ApiError>(vec![1, 2, 3])
    });

    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.status(), QueryStatus::Success);
    assert_eq!(*query.data().unwrap(), vec![1, 2, 3]);
  }

  #[tokio::test]
  async fn test_error_is_stored_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in_fetch = calls.clone();
    let store = CacheStore::new();
    let mut query: QueryBinder<u32> = QueryBinder::bind(store, QueryKey::of("briefs"), move || {
      let calls = calls_in_fetch.clone();
      async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(ApiError::Network("unreachable".into()))
      }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.status(), QueryStatus::Error);
    assert!(query.error().is_some());

    // Polling again must not re-issue the request.
    query.poll();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_binders_coalesce_to_one_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = CacheStore::new();
    let key = QueryKey::of("contacts");

    let mut first = QueryBinder::bind(store.clone(), key.clone(), counted_fetcher(calls.clone(), 1));
    let mut second = QueryBinder::bind(store, key, counted_fetcher(calls.clone(), 2));

    tokio::time::sleep(Duration::from_millis(10)).await;
    first.poll();
    second.poll();

    assert_eq!(first.status(), QueryStatus::Success);
    assert_eq!(second.status(), QueryStatus::Success);
    // Exactly one transport call; the second binder attached to the first.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*second.data().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_invalidation_triggers_refetch_on_poll() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = CacheStore::new();
    let mut query = QueryBinder::bind(
      store.clone(),
      QueryKey::of("meetings"),
      counted_fetcher(calls.clone(), 5),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.status(), QueryStatus::Success);

    store.invalidate(|k| k.is_resource("meetings"));
    // Stale-while-revalidate: data still served while Idle.
    assert_eq!(*query.data().unwrap(), 5);

    assert!(query.poll());
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.status(), QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_rebind_discards_superseded_response() {
    let store = CacheStore::new();
    let slow_key = QueryKey::of("contacts").part("joh");
    let fast_key = QueryKey::of("contacts").part("john");

    let mut query = QueryBinder::bind(store.clone(), slow_key.clone(), || async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok::<_, ApiError>("stale".to_string())
    });

    // Re-key before the slow fetch settles.
    query.rebind(fast_key, || async { Ok::<_, ApiError>("fresh".to_string()) });

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();

    // The binder only ever sees the new key's result...
    assert_eq!(*query.data().unwrap(), "fresh");
    // ...while the slow response settled under its own key.
    let slow_entry = store.read(&slow_key).unwrap();
    assert_eq!(*slow_entry.data::<String>().unwrap(), "stale");
  }

  #[tokio::test]
  async fn test_refetch_forces_new_call() {
    let calls = Arc::new(AtomicU32::new(0));
    let store = CacheStore::new();
    let mut query = QueryBinder::bind(
      store,
      QueryKey::of("briefs"),
      counted_fetcher(calls.clone(), 9),
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    query.refetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert_eq!(query.status(), QueryStatus::Success);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
