//! Write operations and the cache reconciliation that follows them.
//!
//! A mutation runs exactly one transport call. On success the runner
//! invalidates every cache key matched by the mutation's rules, strictly
//! before the settlement becomes observable, so dependent query binders
//! refetch on their next poll. On failure nothing is invalidated: a failed
//! write must leave cached reads exactly as they were.
//!
//! One mutation per triggering control is in flight at a time: `run` is a
//! no-op while the `Mutation` is still pending, and views disable the
//! control until settlement.

use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

use super::cache::CacheStore;
use super::key::QueryKey;
use crate::api::error::ApiError;

/// Which cached keys a successful mutation makes stale.
#[derive(Clone, Debug)]
pub enum InvalidationRule {
  /// Every key whose resource name matches, regardless of discriminators.
  Resource(&'static str),
  /// One exact key.
  Key(QueryKey),
}

impl InvalidationRule {
  pub fn matches(&self, key: &QueryKey) -> bool {
    match self {
      InvalidationRule::Resource(name) => key.is_resource(name),
      InvalidationRule::Key(exact) => key == exact,
    }
  }
}

/// The state of a mutation control.
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  /// Never run.
  Idle,
  /// Operation in flight; the triggering control is disabled.
  Pending,
  /// Last run succeeded.
  Success(T),
  /// Last run failed; the control is re-enabled for retry.
  Error(ApiError),
}

/// One control's mutation lifecycle, polled like a query.
pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T> Mutation<T> {
  pub fn new() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Poll for settlement. Returns true if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Task dropped without sending - treat as a transport failure.
        self.state = MutationState::Error(ApiError::Network("mutation was cancelled".into()));
        self.receiver = None;
        true
      }
    }
  }
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = match &self.state {
      MutationState::Idle => "Idle",
      MutationState::Pending => "Pending",
      MutationState::Success(_) => "Success",
      MutationState::Error(_) => "Error",
    };
    f.debug_struct("Mutation").field("state", &state).finish()
  }
}

/// Executes write operations and applies their invalidation rules.
#[derive(Clone)]
pub struct MutationRunner {
  store: CacheStore,
}

impl MutationRunner {
  pub fn new(store: CacheStore) -> Self {
    Self { store }
  }

  /// Run `op`, settling into `mutation`. No-op while `mutation` is still
  /// pending. On success every rule is applied before the settlement is
  /// delivered, so the UI never observes a successful mutation with stale
  /// entries still marked fresh.
  pub fn run<T, Fut>(&self, mutation: &mut Mutation<T>, op: Fut, rules: Vec<InvalidationRule>)
  where
    T: Send + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if mutation.is_pending() {
      return;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    mutation.state = MutationState::Pending;
    mutation.receiver = Some(rx);

    let store = self.store.clone();
    tokio::spawn(async move {
      let result = op.await;
      if result.is_ok() {
        for rule in &rules {
          debug!(?rule, "mutation succeeded, invalidating");
          store.invalidate(|key| rule.matches(key));
        }
      }
      // Ignore send errors - the control may have been unmounted.
      let _ = tx.send(result);
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::binder::QueryBinder;
  use crate::store::cache::QueryStatus;
  use std::sync::{Arc, Mutex};
  use std::time::Duration;

  #[tokio::test]
  async fn test_success_applies_rules() {
    let store = CacheStore::new();
    store.write(&QueryKey::of("meetings"), 1u32);
    store.write(&QueryKey::of("briefs"), 2u32);
    store.write(&QueryKey::of("contacts"), 3u32);

    let runner = MutationRunner::new(store.clone());
    let mut mutation = Mutation::new();
    runner.run(
      &mut mutation,
      async { Ok::<_, ApiError>(()) },
      vec![
        InvalidationRule::Resource("meetings"),
        InvalidationRule::Key(QueryKey::of("briefs")),
      ],
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert!(matches!(mutation.state(), MutationState::Success(())));

    // Matched entries are stale but keep their data.
    let meetings = store.read(&QueryKey::of("meetings")).unwrap();
    assert_eq!(meetings.status, QueryStatus::Idle);
    assert!(meetings.has_data());
    assert_eq!(
      store.read(&QueryKey::of("briefs")).unwrap().status,
      QueryStatus::Idle
    );
    // Unmatched entries are untouched.
    assert_eq!(
      store.read(&QueryKey::of("contacts")).unwrap().status,
      QueryStatus::Success
    );
  }

  #[tokio::test]
  async fn test_failure_touches_nothing() {
    let store = CacheStore::new();
    store.write(&QueryKey::of("contacts"), vec!["ada".to_string()]);

    let runner = MutationRunner::new(store.clone());
    let mut mutation: Mutation<()> = Mutation::new();
    runner.run(
      &mut mutation,
      async {
        Err(ApiError::Validation {
          detail: "contact with this email already exists".into(),
        })
      },
      vec![InvalidationRule::Resource("contacts")],
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert!(mutation.error().is_some());

    let entry = store.read(&QueryKey::of("contacts")).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(*entry.data::<Vec<String>>().unwrap(), vec!["ada".to_string()]);
  }

  #[tokio::test]
  async fn test_pending_gate_refuses_second_run() {
    let store = CacheStore::new();
    let runner = MutationRunner::new(store);
    let mut mutation = Mutation::new();

    runner.run(
      &mut mutation,
      async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ApiError>("first")
      },
      Vec::new(),
    );
    assert!(mutation.is_pending());

    // Duplicate submission while pending is dropped.
    runner.run(&mut mutation, async { Ok::<_, ApiError>("second") }, Vec::new());

    tokio::time::sleep(Duration::from_millis(100)).await;
    mutation.poll();
    match mutation.state() {
      MutationState::Success(v) => assert_eq!(*v, "first"),
      other => panic!("unexpected state: {:?}", std::mem::discriminant(other)),
    }
  }

  #[tokio::test]
  async fn test_generation_flow_refetches_meetings() {
    // generate brief -> invalidate meetings+briefs -> the meetings binder
    // transitions Success -> Loading -> Success with the brief flag set.
    let store = CacheStore::new();
    let source = Arc::new(Mutex::new(vec![("m1".to_string(), false)]));

    let fetch_source = source.clone();
    let mut meetings = QueryBinder::bind(store.clone(), QueryKey::of("meetings"), move || {
      let source = fetch_source.clone();
      async move { Ok::<_, ApiError>(source.lock().unwrap().clone()) }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    meetings.poll();
    assert!(!meetings.data().unwrap()[0].1);

    let runner = MutationRunner::new(store);
    let mut generate = Mutation::new();
    let op_source = source.clone();
    runner.run(
      &mut generate,
      async move {
        op_source.lock().unwrap()[0].1 = true;
        Ok::<_, ApiError>("brief-1".to_string())
      },
      vec![
        InvalidationRule::Resource("meetings"),
        InvalidationRule::Resource("briefs"),
      ],
    );

    tokio::time::sleep(Duration::from_millis(10)).await;
    generate.poll();
    assert!(matches!(generate.state(), MutationState::Success(_)));

    meetings.poll();
    assert_eq!(meetings.status(), QueryStatus::Loading);

    tokio::time::sleep(Duration::from_millis(10)).await;
    meetings.poll();
    assert_eq!(meetings.status(), QueryStatus::Success);
    assert!(meetings.data().unwrap()[0].1);
  }
}
