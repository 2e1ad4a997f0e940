//! Optimistic reconciliation engine
//!
//! The reconciler keeps two views of the domain state:
//! - `confirmed_state`: the last state acknowledged by the authority
//! - `state`: the optimistic view, `confirmed_state` with every pending
//!   move re-applied in application order
//!
//! Every operation replaces both views wholesale and leaves the fold
//! invariant `state == fold(reducer, confirmed_state, pending)` intact.

use std::fmt;

use tally_core::{MoveId, ReconcileError, ReconcileResult, Reducer, Version};
use tracing::{debug, trace, warn};

use crate::{PendingMove, PendingQueue, ReconcilerConfig, VersionPolicy};

type AcceptedFn<S, M> = Box<dyn FnMut(&S, &M) + Send>;
type RejectedFn<M> = Box<dyn FnMut(&str, &M) + Send>;

/// Notification hooks, invoked synchronously from the operation that
/// decided the move
pub struct Callbacks<S, M> {
    on_move_accepted: Option<AcceptedFn<S, M>>,
    on_move_rejected: Option<RejectedFn<M>>,
}

impl<S, M> Callbacks<S, M> {
    pub fn new() -> Self {
        Callbacks {
            on_move_accepted: None,
            on_move_rejected: None,
        }
    }

    pub fn on_move_accepted(mut self, f: impl FnMut(&S, &M) + Send + 'static) -> Self {
        self.on_move_accepted = Some(Box::new(f));
        self
    }

    pub fn on_move_rejected(mut self, f: impl FnMut(&str, &M) + Send + 'static) -> Self {
        self.on_move_rejected = Some(Box::new(f));
        self
    }

    fn accepted(&mut self, server_state: &S, mv: &M) {
        if let Some(f) = self.on_move_accepted.as_mut() {
            f(server_state, mv);
        }
    }

    fn rejected(&mut self, reason: &str, mv: &M) {
        if let Some(f) = self.on_move_rejected.as_mut() {
            f(reason, mv);
        }
    }
}

impl<S, M> Default for Callbacks<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> fmt::Debug for Callbacks<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_move_accepted", &self.on_move_accepted.is_some())
            .field("on_move_rejected", &self.on_move_rejected.is_some())
            .finish()
    }
}

/// Lifetime counters for a reconciler. Not cleared by `reset`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub applied: u64,
    /// Pending moves dequeued by an acceptance
    pub accepted: u64,
    /// Pending moves dequeued by a rejection
    pub rejected: u64,
    pub resyncs: u64,
    pub dropped_on_resync: u64,
    /// Accept/reject calls whose move was not pending
    pub unmatched: u64,
    /// Acceptances whose version was not newer than the current one
    pub stale_versions: u64,
    pub resets: u64,
}

/// Optimistic state reconciler
pub struct OptimisticReconciler<S, M, R> {
    reducer: R,
    initial_state: S,
    confirmed_state: S,
    state: S,
    pending: PendingQueue<M>,
    version: Version,
    config: ReconcilerConfig,
    callbacks: Callbacks<S, M>,
    stats: ReconcileStats,
}

impl<S, M, R> OptimisticReconciler<S, M, R>
where
    S: Clone,
    M: Clone + PartialEq,
    R: Reducer<S, M>,
{
    pub fn new(initial_state: S, reducer: R) -> Self {
        Self::with_config(initial_state, reducer, ReconcilerConfig::default())
    }

    pub fn with_config(initial_state: S, reducer: R, config: ReconcilerConfig) -> Self {
        OptimisticReconciler {
            reducer,
            confirmed_state: initial_state.clone(),
            state: initial_state.clone(),
            initial_state,
            pending: PendingQueue::new(),
            version: Version::INITIAL,
            config,
            callbacks: Callbacks::new(),
            stats: ReconcileStats::default(),
        }
    }

    /// Install notification hooks
    pub fn with_callbacks(mut self, callbacks: Callbacks<S, M>) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn set_callbacks(&mut self, callbacks: Callbacks<S, M>) {
        self.callbacks = callbacks;
    }

    /// Optimistic view: confirmed state plus every pending move
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Last state acknowledged by the authority
    pub fn confirmed_state(&self) -> &S {
        &self.confirmed_state
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn has_pending_moves(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending moves in application order
    pub fn pending_moves(&self) -> impl Iterator<Item = (MoveId, &M)> {
        self.pending.iter().map(|pending| (pending.id, &pending.mv))
    }

    /// Oldest move still awaiting a decision
    pub fn oldest_pending(&self) -> Option<(MoveId, &M)> {
        self.pending.front().map(|pending| (pending.id, &pending.mv))
    }

    pub fn is_pending(&self, id: MoveId) -> bool {
        self.pending.contains(id)
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    /// Recompute the optimistic view from scratch
    pub fn replay(&self) -> S {
        self.reducer.fold(&self.confirmed_state, self.pending.moves())
    }

    /// Apply a predicted move immediately. Never fails.
    pub fn apply_optimistic_move(&mut self, mv: M) -> MoveId {
        self.state = self.reducer.apply(&self.state, &mv);
        let id = self.pending.push(mv);
        self.stats.applied += 1;

        trace!(move_id = %id, pending = self.pending.len(), "optimistic move applied");
        id
    }

    /// Like `apply_optimistic_move`, but honours `max_pending`
    pub fn try_apply_optimistic_move(&mut self, mv: M) -> ReconcileResult<MoveId> {
        if let Some(limit) = self.config.max_pending {
            if self.pending.len() >= limit {
                return Err(ReconcileError::PendingLimitReached { limit });
            }
        }
        Ok(self.apply_optimistic_move(mv))
    }

    /// The authority accepted `confirmed_move`, producing `server_state`
    ///
    /// Dequeues the oldest pending move equal to `confirmed_move`.
    pub fn handle_move_accepted(
        &mut self,
        server_state: S,
        new_version: Version,
        confirmed_move: &M,
    ) {
        let removed = self.pending.remove_first_eq(confirmed_move);
        match removed {
            Some(_) => self.stats.accepted += 1,
            None => {
                self.stats.unmatched += 1;
                warn!(version = %new_version, "accepted move is not pending");
            }
        }

        self.callbacks.accepted(&server_state, confirmed_move);
        self.accept(removed.map(|p| p.id), server_state, new_version);
    }

    /// The authority accepted the move issued under `id`
    ///
    /// Returns the dequeued move, or `None` if it was no longer pending. The
    /// acknowledged state is adopted either way.
    pub fn confirm_move(&mut self, id: MoveId, server_state: S, new_version: Version) -> Option<M> {
        let removed = self.pending.remove_id(id);
        match &removed {
            Some(pending) => {
                self.stats.accepted += 1;
                self.callbacks.accepted(&server_state, &pending.mv);
            }
            None => {
                self.stats.unmatched += 1;
                debug!(
                    move_id = %id,
                    version = %new_version,
                    "confirmation for move no longer pending"
                );
            }
        }
        self.accept(Some(id), server_state, new_version);

        removed.map(|pending| pending.mv)
    }

    /// The authority rejected `rejected_move`; its effect is discarded
    pub fn handle_move_rejected(&mut self, reason: &str, rejected_move: &M) {
        match self.pending.remove_first_eq(rejected_move) {
            Some(_) => self.stats.rejected += 1,
            None => {
                self.stats.unmatched += 1;
                warn!(reason, "rejected move is not pending");
            }
        }

        self.rollback(reason);
        self.callbacks.rejected(reason, rejected_move);
    }

    /// The authority rejected the move issued under `id`
    ///
    /// Unknown ids are an error, counted as unmatched, and leave the state
    /// untouched.
    pub fn reject_move(&mut self, id: MoveId, reason: &str) -> ReconcileResult<M> {
        let Some(PendingMove { mv, .. }) = self.pending.remove_id(id) else {
            self.stats.unmatched += 1;
            return Err(ReconcileError::UnknownMove(id));
        };

        self.stats.rejected += 1;
        self.rollback(reason);
        self.callbacks.rejected(reason, &mv);
        Ok(mv)
    }

    /// Unconditional resync: adopt `server_state` and drop every prediction
    pub fn sync_with_server(&mut self, server_state: S, new_version: Version) {
        let dropped = self.pending.clear();
        if dropped > 0 {
            warn!(dropped, version = %new_version, "resync dropped pending predictions");
        }

        self.confirmed_state = server_state.clone();
        self.state = server_state;
        self.version = new_version;
        self.stats.resyncs += 1;
        self.stats.dropped_on_resync += dropped as u64;
    }

    /// Restore the condition at construction
    pub fn reset(&mut self) {
        let dropped = self.pending.clear();
        self.confirmed_state = self.initial_state.clone();
        self.state = self.initial_state.clone();
        self.version = Version::INITIAL;
        self.stats.resets += 1;

        debug!(dropped, "reconciler reset");
    }

    fn accept(&mut self, id: Option<MoveId>, server_state: S, new_version: Version) {
        let stale = !new_version.is_newer_than(self.version);
        if stale {
            self.stats.stale_versions += 1;
        }

        if stale && self.config.version_policy == VersionPolicy::IgnoreStale {
            debug!(
                move_id = ?id,
                current = %self.version,
                received = %new_version,
                "stale acceptance, keeping confirmed state"
            );
        } else {
            if stale {
                warn!(
                    current = %self.version,
                    received = %new_version,
                    "acceptance did not advance version"
                );
            }
            self.confirmed_state = server_state;
            self.version = new_version;
        }

        self.state = self.replay();
        debug!(
            move_id = ?id,
            version = %self.version,
            pending = self.pending.len(),
            "move accepted"
        );
    }

    fn rollback(&mut self, reason: &str) {
        self.state = self.replay();
        debug!(reason, pending = self.pending.len(), "move rejected, rolled back");
    }
}

impl<S, M, R> fmt::Debug for OptimisticReconciler<S, M, R>
where
    S: fmt::Debug,
    M: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticReconciler")
            .field("state", &self.state)
            .field("confirmed_state", &self.confirmed_state)
            .field("pending", &self.pending)
            .field("version", &self.version)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
