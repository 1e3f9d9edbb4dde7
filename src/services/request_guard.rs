//! Store state guarded against out-of-order responses.
//!
//! Every fetch takes a [`RequestToken`]. Only the holder of the most recent
//! token may write the collection or clear the loading flag; responses that
//! arrive for older tokens are dropped.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Fetch,
    Create,
    Update,
    Delete,
    Save,
    Validate,
    Execute,
    Connect,
    Link,
    ResetPassword,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Superseded,
}

#[derive(Clone, Debug)]
pub struct RequestToken {
    id: u64,
    latest: Arc<AtomicU64>,
}

impl RequestToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// False once a newer fetch has started on the same store.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.id
    }
}

struct Slot<C> {
    data: C,
    fetching: bool,
    mutations: usize,
    error: Option<String>,
    last_operation: Option<Operation>,
}

pub struct GuardedState<C> {
    slot: Mutex<Slot<C>>,
    latest: Arc<AtomicU64>,
}

impl<C: Default + Clone> Default for GuardedState<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> GuardedState<C> {
    fn lock(&self) -> MutexGuard<'_, Slot<C>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Lowers the fetch flag when a fetch future is dropped before completing,
/// unless a newer fetch owns the flag by then.
struct FetchGuard<'a, C> {
    state: &'a GuardedState<C>,
    token: RequestToken,
}

impl<C> Drop for FetchGuard<'_, C> {
    fn drop(&mut self) {
        let mut slot = self.state.lock();
        if self.token.is_current() {
            slot.fetching = false;
        }
    }
}

/// Releases one in-flight mutation, however its future ends.
struct MutationGuard<'a, C> {
    state: &'a GuardedState<C>,
}

impl<C> Drop for MutationGuard<'_, C> {
    fn drop(&mut self) {
        let mut slot = self.state.lock();
        slot.mutations = slot.mutations.saturating_sub(1);
    }
}

impl<C: Default + Clone> GuardedState<C> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                data: C::default(),
                fetching: false,
                mutations: 0,
                error: None,
                last_operation: None,
            }),
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn snapshot(&self) -> C {
        self.lock().data.clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.lock().data)
    }

    pub fn is_loading(&self) -> bool {
        let slot = self.lock();
        slot.fetching || slot.mutations > 0
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn last_operation(&self) -> Option<Operation> {
        self.lock().last_operation
    }

    pub fn begin_fetch(&self) -> RequestToken {
        let mut slot = self.lock();
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        slot.fetching = true;
        slot.error = None;
        slot.last_operation = Some(Operation::Fetch);
        RequestToken {
            id,
            latest: Arc::clone(&self.latest),
        }
    }

    /// Applies the outcome of the fetch identified by `token`.
    ///
    /// Failures of the current fetch empty the collection and fill the error
    /// slot. Outcomes of superseded fetches are discarded, errors included.
    pub fn complete(
        &self,
        token: &RequestToken,
        result: Result<C, AppError>,
    ) -> Result<FetchOutcome, AppError> {
        let mut slot = self.lock();
        if !token.is_current() {
            log::debug!("Discarding superseded response for request {}", token.id);
            return Ok(FetchOutcome::Superseded);
        }

        slot.fetching = false;
        match result {
            Ok(data) => {
                slot.data = data;
                Ok(FetchOutcome::Applied)
            }
            Err(err) => {
                slot.error = Some(err.to_string());
                slot.data = C::default();
                Err(err)
            }
        }
    }

    pub async fn fetch_with<F, Fut>(&self, fetch: F) -> Result<FetchOutcome, AppError>
    where
        F: FnOnce(RequestToken) -> Fut,
        Fut: Future<Output = Result<C, AppError>>,
    {
        let guard = FetchGuard {
            state: self,
            token: self.begin_fetch(),
        };
        let result = fetch(guard.token.clone()).await;
        self.complete(&guard.token, result)
    }

    /// Runs a create/update/delete style operation, keeping the loading flag
    /// raised while it is in flight and recording its failure.
    pub async fn track_mutation<Fut, R>(&self, operation: Operation, fut: Fut) -> Result<R, AppError>
    where
        Fut: Future<Output = Result<R, AppError>>,
    {
        let guard = {
            let mut slot = self.lock();
            slot.mutations += 1;
            slot.error = None;
            slot.last_operation = Some(operation);
            MutationGuard { state: self }
        };

        let result = fut.await;
        drop(guard);

        if let Err(err) = &result {
            self.lock().error = Some(err.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn late_response_of_older_fetch_is_discarded() {
        let state: Arc<GuardedState<Vec<i32>>> = Arc::new(GuardedState::new());
        let (tx_a, rx_a) = oneshot::channel::<Vec<i32>>();
        let (tx_b, rx_b) = oneshot::channel::<Vec<i32>>();

        let first = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state
                    .fetch_with(|_| async move { rx_a.await.map_err(|_| AppError::Payload("closed".into())) })
                    .await
            })
        };
        while state.latest.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }

        let second = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state
                    .fetch_with(|_| async move { rx_b.await.map_err(|_| AppError::Payload("closed".into())) })
                    .await
            })
        };
        while state.latest.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        tx_b.send(vec![2]).unwrap();
        assert_eq!(second.await.unwrap().unwrap(), FetchOutcome::Applied);
        assert!(!state.is_loading());

        tx_a.send(vec![1]).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), FetchOutcome::Superseded);
        assert_eq!(state.snapshot(), vec![2]);
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn stale_fetch_does_not_clear_loading_of_newer_one() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        let old = state.begin_fetch();
        let new = state.begin_fetch();

        assert_eq!(state.complete(&old, Ok(vec![1])).unwrap(), FetchOutcome::Superseded);
        assert!(state.is_loading());

        state.complete(&new, Ok(vec![3])).unwrap();
        assert!(!state.is_loading());
        assert_eq!(state.snapshot(), vec![3]);
    }

    #[tokio::test]
    async fn failed_fetch_empties_collection_and_sets_error() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        state.fetch_with(|_| async { Ok(vec![1, 2]) }).await.unwrap();

        let err = state
            .fetch_with(|_| async { Err(AppError::Payload("broken".into())) })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "PAYLOAD_ERROR");
        assert!(state.snapshot().is_empty());
        assert_eq!(state.error().as_deref(), Some("Unexpected response format: broken"));
    }

    #[tokio::test]
    async fn stale_failure_is_ignored() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        let old = state.begin_fetch();
        let new = state.begin_fetch();
        state.complete(&new, Ok(vec![7])).unwrap();

        let outcome = state.complete(&old, Err(AppError::Unauthorized)).unwrap();
        assert_eq!(outcome, FetchOutcome::Superseded);
        assert_eq!(state.snapshot(), vec![7]);
        assert!(state.error().is_none());
    }

    #[tokio::test]
    async fn token_passed_to_fetch_reports_currency() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        state
            .fetch_with(|token| async move {
                assert!(token.is_current());
                Ok(vec![])
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mutation_failure_keeps_collection() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        state.fetch_with(|_| async { Ok(vec![1]) }).await.unwrap();

        let result: Result<(), AppError> = state
            .track_mutation(Operation::Update, async { Err(AppError::InvalidInput("id is required".into())) })
            .await;

        assert!(result.is_err());
        assert_eq!(state.snapshot(), vec![1]);
        assert_eq!(state.last_operation(), Some(Operation::Update));
        assert!(state.error().unwrap().contains("id is required"));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn dropped_mutation_releases_loading_flag() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        let pending = state.track_mutation(Operation::Create, std::future::pending::<Result<(), AppError>>());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert!(timed_out.is_err());
        assert!(!state.is_loading());
        state.fetch_with(|_| async { Ok(vec![1]) }).await.unwrap();
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn dropped_fetch_releases_loading_flag() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();
        let pending = state.fetch_with(|_| std::future::pending::<Result<Vec<i32>, AppError>>());

        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;

        assert!(timed_out.is_err());
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn dropped_stale_fetch_leaves_newer_fetch_loading() {
        let state: GuardedState<Vec<i32>> = GuardedState::new();

        let mut stale = Box::pin(state.fetch_with(|_| std::future::pending::<Result<Vec<i32>, AppError>>()));
        assert!(futures_util::poll!(stale.as_mut()).is_pending());
        let newer = state.begin_fetch();
        drop(stale);

        assert!(state.is_loading());
        state.complete(&newer, Ok(vec![4])).unwrap();
        assert!(!state.is_loading());
        assert_eq!(state.snapshot(), vec![4]);
    }
}
