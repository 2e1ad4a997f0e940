//! Shared reconciler handle for hosts that drive one reconciler from
//! several tasks (input handling on one side, network receive on the other)

use std::sync::Arc;

use parking_lot::Mutex;
use tally_core::{MoveId, ReconcileResult, Reducer, Version};

use crate::{OptimisticReconciler, ReconcileStats, ReconcilerConfig};

/// Cloneable, lock-guarded reconciler
///
/// Every method holds the lock for exactly one operation. Callbacks run
/// under the lock and must not call back into the handle.
pub struct SharedReconciler<S, M, R> {
    inner: Arc<Mutex<OptimisticReconciler<S, M, R>>>,
}

impl<S, M, R> Clone for SharedReconciler<S, M, R> {
    fn clone(&self) -> Self {
        SharedReconciler {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, M, R> SharedReconciler<S, M, R>
where
    S: Clone,
    M: Clone + PartialEq,
    R: Reducer<S, M>,
{
    pub fn new(reconciler: OptimisticReconciler<S, M, R>) -> Self {
        SharedReconciler {
            inner: Arc::new(Mutex::new(reconciler)),
        }
    }

    pub fn from_initial(initial_state: S, reducer: R, config: ReconcilerConfig) -> Self {
        Self::new(OptimisticReconciler::with_config(initial_state, reducer, config))
    }

    /// Run `f` with exclusive access
    pub fn with<T>(&self, f: impl FnOnce(&mut OptimisticReconciler<S, M, R>) -> T) -> T {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Clone of the optimistic view
    pub fn snapshot(&self) -> S {
        self.inner.lock().state().clone()
    }

    pub fn version(&self) -> Version {
        self.inner.lock().version()
    }

    pub fn has_pending_moves(&self) -> bool {
        self.inner.lock().has_pending_moves()
    }

    pub fn stats(&self) -> ReconcileStats {
        self.inner.lock().stats().clone()
    }

    pub fn apply_optimistic_move(&self, mv: M) -> MoveId {
        self.inner.lock().apply_optimistic_move(mv)
    }

    pub fn try_apply_optimistic_move(&self, mv: M) -> ReconcileResult<MoveId> {
        self.inner.lock().try_apply_optimistic_move(mv)
    }

    pub fn handle_move_accepted(&self, server_state: S, new_version: Version, confirmed_move: &M) {
        self.inner
            .lock()
            .handle_move_accepted(server_state, new_version, confirmed_move)
    }

    pub fn handle_move_rejected(&self, reason: &str, rejected_move: &M) {
        self.inner
            .lock()
            .handle_move_rejected(reason, rejected_move)
    }

    pub fn confirm_move(&self, id: MoveId, server_state: S, new_version: Version) -> Option<M> {
        self.inner
            .lock()
            .confirm_move(id, server_state, new_version)
    }

    pub fn reject_move(&self, id: MoveId, reason: &str) -> ReconcileResult<M> {
        self.inner.lock().reject_move(id, reason)
    }

    pub fn sync_with_server(&self, server_state: S, new_version: Version) {
        self.inner
            .lock()
            .sync_with_server(server_state, new_version)
    }

    pub fn reset(&self) {
        self.inner.lock().reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn add(state: &i64, mv: &i64) -> i64 {
        state + mv
    }

    #[test]
    fn test_shared_across_threads() {
        let shared = SharedReconciler::from_initial(
            0i64,
            add as fn(&i64, &i64) -> i64,
            ReconcilerConfig::default(),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        shared.apply_optimistic_move(1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.snapshot(), 100);
        assert_eq!(shared.stats().applied, 100);
        shared.with(|r| assert_eq!(r.replay(), *r.state()));
    }

    #[test]
    fn test_confirm_through_handle() {
        let shared = SharedReconciler::from_initial(
            0i64,
            add as fn(&i64, &i64) -> i64,
            ReconcilerConfig::default(),
        );
        let id = shared.apply_optimistic_move(5);

        assert_eq!(shared.confirm_move(id, 5, Version::new(2)), Some(5));
        assert!(!shared.has_pending_moves());
        assert_eq!(shared.version(), Version::new(2));

        shared.reset();
        assert_eq!(shared.snapshot(), 0);
    }
}
