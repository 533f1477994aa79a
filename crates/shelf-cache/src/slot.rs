use std::future::Future;
use std::sync::{Arc, Mutex};

/// Stamp for one refresh attempt, handed out by [`Slot::begin_refresh`].
///
/// A token is only good for the slot that issued it. Committing with a token
/// whose generation is no longer current is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshToken(u64);

impl RefreshToken {
    /// The generation this token was issued for.
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Read-only view of a slot, taken at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// The last committed list. Empty both before the first load and after a
    /// successful load that found nothing; `has_loaded_once` tells the two
    /// apart.
    pub items: Arc<[T]>,
    /// Whether the most recently started refresh has neither committed nor
    /// failed yet.
    pub is_loading: bool,
    /// Whether any refresh ever committed successfully.
    pub has_loaded_once: bool,
}

/// Outcome of a guarded refresh cycle.
///
/// `Cancelled` is an expected, frequent result of normal operation (rapid
/// re-renders, instance switches), which is why it is a value and not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome<T> {
    /// This refresh won the race and its result is now the committed list.
    Fetched(Arc<[T]>),
    /// A newer refresh was started before this one completed; the result was
    /// discarded on arrival. Callers should treat this as a no-op.
    Cancelled,
}

impl<T> RefreshOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RefreshOutcome::Cancelled)
    }

    /// The committed items, if this refresh was the one that committed.
    pub fn items(&self) -> Option<&Arc<[T]>> {
        match self {
            RefreshOutcome::Fetched(items) => Some(items),
            RefreshOutcome::Cancelled => None,
        }
    }
}

#[derive(Debug)]
struct State<T> {
    items: Arc<[T]>,
    generation: u64,
    loading: bool,
    loaded_once: bool,
}

/// A single cache cell guarded by a refresh generation.
///
/// All mutation goes through [`begin_refresh`](Slot::begin_refresh),
/// [`commit`](Slot::commit) and [`commit_failure`](Slot::commit_failure);
/// readers only ever take [`snapshot`](Slot::snapshot)s. The slot upholds:
///
/// - the generation increases by exactly one per `begin_refresh` call;
/// - at most one result is ever committed per generation, and only while
///   that generation is still current;
/// - a failed refresh never clears previously committed items.
#[derive(Debug)]
pub struct Slot<T> {
    state: Mutex<State<T>>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: Arc::from(Vec::new()),
                generation: 0,
                loading: false,
                loaded_once: false,
            }),
        }
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        let state = self.state.lock().unwrap();
        Snapshot {
            items: Arc::clone(&state.items),
            is_loading: state.loading,
            has_loaded_once: state.loaded_once,
        }
    }

    /// The current refresh generation. Starts at 0 for a slot that never
    /// began a refresh.
    pub fn generation(&self) -> u64 {
        self.state.lock().unwrap().generation
    }

    /// Starts a new refresh: bumps the generation, marks the slot as loading
    /// and returns the token the eventual result must present to commit.
    ///
    /// Any refresh begun earlier is superseded from this point on, its
    /// result will be discarded when it arrives.
    pub fn begin_refresh(&self) -> RefreshToken {
        let mut state = self.state.lock().unwrap();
        state.generation += 1;
        state.loading = true;
        RefreshToken(state.generation)
    }

    /// Commits `items` as the new list if `token` still owns the slot.
    ///
    /// Returns the committed list, or `None` if a newer refresh was started
    /// since `token` was issued; in that case the slot is left untouched and
    /// the newer refresh keeps ownership of the loading flag.
    pub fn commit(&self, token: RefreshToken, items: Vec<T>) -> Option<Arc<[T]>> {
        let mut state = self.state.lock().unwrap();
        if token.0 != state.generation {
            return None;
        }
        state.items = Arc::from(items);
        state.loading = false;
        state.loaded_once = true;
        Some(Arc::clone(&state.items))
    }

    /// Records a failed refresh.
    ///
    /// If `token` is still current this clears the loading flag and leaves
    /// the items at their last good value; an error never blanks a
    /// previously successful list. Returns whether the token was current.
    pub fn commit_failure(&self, token: RefreshToken) -> bool {
        let mut state = self.state.lock().unwrap();
        if token.0 != state.generation {
            return false;
        }
        state.loading = false;
        true
    }

    /// Drives one full guarded refresh around `fut`.
    ///
    /// The refresh begins (and the generation is bumped) when this method is
    /// *called*, not when the returned future is first polled; `fut`'s
    /// output is then committed under the issued token. A superseded result
    /// maps to [`RefreshOutcome::Cancelled`] whether `fut` succeeded or
    /// failed; an error from `fut` is only surfaced while the token is
    /// current.
    pub fn refresh_with<'a, E, F>(
        &'a self,
        fut: F,
    ) -> impl Future<Output = Result<RefreshOutcome<T>, E>> + 'a
    where
        F: Future<Output = Result<Vec<T>, E>> + 'a,
    {
        let token = self.begin_refresh();
        async move {
            match fut.await {
                Ok(items) => Ok(match self.commit(token, items) {
                    Some(items) => RefreshOutcome::Fetched(items),
                    None => RefreshOutcome::Cancelled,
                }),
                Err(err) => {
                    if self.commit_failure(token) {
                        Err(err)
                    } else {
                        Ok(RefreshOutcome::Cancelled)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[test]
    fn generation_increments_once_per_begin() {
        let slot: Slot<u32> = Slot::new();
        assert_eq!(slot.generation(), 0);

        for expected in 1..=5 {
            let token = slot.begin_refresh();
            assert_eq!(token.generation(), expected);
            assert_eq!(slot.generation(), expected);
        }
    }

    #[test]
    fn never_loaded_is_distinct_from_loaded_empty() {
        let slot: Slot<u32> = Slot::new();
        let snapshot = slot.snapshot();
        assert!(snapshot.items.is_empty());
        assert!(!snapshot.has_loaded_once);

        let token = slot.begin_refresh();
        slot.commit(token, Vec::new()).unwrap();

        let snapshot = slot.snapshot();
        assert!(snapshot.items.is_empty());
        assert!(snapshot.has_loaded_once);
        assert!(!snapshot.is_loading);
    }

    #[test]
    fn stale_commit_is_discarded() {
        let slot = Slot::new();
        let first = slot.begin_refresh();
        let second = slot.begin_refresh();

        // The superseded result arrives last but must not win.
        assert!(slot.commit(second, vec![2]).is_some());
        assert!(slot.commit(first, vec![1]).is_none());

        let snapshot = slot.snapshot();
        assert_eq!(*snapshot.items, [2]);
        assert!(!snapshot.is_loading);
    }

    #[test]
    fn stale_commit_does_not_clear_newer_loading_flag() {
        let slot = Slot::new();
        let first = slot.begin_refresh();
        let second = slot.begin_refresh();

        assert!(slot.commit(first, vec![1]).is_none());
        // The second refresh still owns the slot.
        assert!(slot.snapshot().is_loading);

        assert!(slot.commit(second, vec![2]).is_some());
        assert!(!slot.snapshot().is_loading);
    }

    #[test]
    fn failure_keeps_last_good_items() {
        let slot = Slot::new();
        let token = slot.begin_refresh();
        slot.commit(token, vec![1, 2]).unwrap();

        let token = slot.begin_refresh();
        assert!(slot.snapshot().is_loading);
        assert!(slot.commit_failure(token));

        let snapshot = slot.snapshot();
        assert_eq!(*snapshot.items, [1, 2]);
        assert!(!snapshot.is_loading);
        assert!(snapshot.has_loaded_once);
    }

    #[test]
    fn stale_failure_is_discarded() {
        let slot: Slot<u32> = Slot::new();
        let first = slot.begin_refresh();
        let second = slot.begin_refresh();

        assert!(!slot.commit_failure(first));
        // The newer refresh is still outstanding.
        assert!(slot.snapshot().is_loading);
        assert!(slot.commit_failure(second));
        assert!(!slot.snapshot().is_loading);
    }

    #[tokio::test]
    async fn refresh_with_commits_on_success() {
        let slot = Slot::new();
        let outcome = slot
            .refresh_with(async { Ok::<_, &str>(vec![1, 2, 3]) })
            .await
            .unwrap();

        assert_eq!(outcome.items().map(|items| items.len()), Some(3));
        let snapshot = slot.snapshot();
        assert_eq!(*snapshot.items, [1, 2, 3]);
        assert!(snapshot.has_loaded_once);
    }

    #[tokio::test]
    async fn superseded_refresh_resolves_cancelled() {
        let slot = Slot::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();

        let first = slot.refresh_with(async { rx1.await.unwrap() });
        let second = slot.refresh_with(async { rx2.await.unwrap() });

        // Both refreshes have begun (generations 1 and 2); the first one's
        // result arrives after the second superseded it.
        tx2.send(Ok::<_, &str>(vec![2])).unwrap();
        tx1.send(Ok::<_, &str>(vec![1])).unwrap();

        let (first, second) = futures::join!(first, second);
        assert_eq!(first.unwrap(), RefreshOutcome::Cancelled);
        assert_eq!(*second.unwrap().items().unwrap().clone(), [2]);

        assert_eq!(*slot.snapshot().items, [2]);
    }

    #[tokio::test]
    async fn superseded_failure_resolves_cancelled_not_err() {
        let slot: Slot<u32> = Slot::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();

        let first = slot.refresh_with(async { rx1.await.unwrap() });
        let second = slot.refresh_with(async { rx2.await.unwrap() });

        tx1.send(Err("boom")).unwrap();
        tx2.send(Ok::<_, &str>(vec![7])).unwrap();

        let (first, second) = futures::join!(first, second);
        // The failure belongs to a superseded generation and is swallowed.
        assert_eq!(first.unwrap(), RefreshOutcome::Cancelled);
        assert_eq!(*second.unwrap().items().unwrap().clone(), [7]);
    }

    #[tokio::test]
    async fn current_failure_is_surfaced() {
        let slot: Slot<u32> = Slot::new();
        let err = slot
            .refresh_with(async { Err::<Vec<u32>, _>("disk on fire") })
            .await
            .unwrap_err();
        assert_eq!(err, "disk on fire");
        assert!(!slot.snapshot().is_loading);
    }
}
