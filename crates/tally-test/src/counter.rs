//! Reference counter game
//!
//! The smallest domain that exercises every reconciler path: moves are
//! order-sensitive (`moves` counts them) and the authority can refuse them.

use std::fmt;

use tally_state::{OptimisticReconciler, ReconcilerConfig};

/// Player identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActorId(pub u32);

impl ActorId {
    #[inline]
    pub fn new(id: u32) -> Self {
        ActorId(id)
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor({})", self.0)
    }
}

/// Counter board
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CounterState {
    pub value: i64,
    /// Number of moves folded into this state
    pub moves: u64,
}

impl CounterState {
    pub const ZERO: CounterState = CounterState { value: 0, moves: 0 };

    pub fn new(value: i64, moves: u64) -> Self {
        CounterState { value, moves }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterOp {
    Increment,
    Decrement,
    Add(i64),
}

/// One player action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CounterMove {
    pub actor: ActorId,
    pub op: CounterOp,
    /// Client timestamp (ms)
    pub at_ms: u64,
}

impl CounterMove {
    pub fn new(actor: ActorId, op: CounterOp, at_ms: u64) -> Self {
        CounterMove { actor, op, at_ms }
    }

    pub fn increment(actor: ActorId, at_ms: u64) -> Self {
        Self::new(actor, CounterOp::Increment, at_ms)
    }

    pub fn decrement(actor: ActorId, at_ms: u64) -> Self {
        Self::new(actor, CounterOp::Decrement, at_ms)
    }

    /// Signed change this move makes to the value
    pub fn delta(&self) -> i64 {
        match self.op {
            CounterOp::Increment => 1,
            CounterOp::Decrement => -1,
            CounterOp::Add(n) => n,
        }
    }
}

/// Counter reducer. Total: arithmetic saturates.
pub fn apply_counter_move(state: &CounterState, mv: &CounterMove) -> CounterState {
    CounterState {
        value: state.value.saturating_add(mv.delta()),
        moves: state.moves.saturating_add(1),
    }
}

pub type CounterReducer = fn(&CounterState, &CounterMove) -> CounterState;

pub type CounterReconciler = OptimisticReconciler<CounterState, CounterMove, CounterReducer>;

/// Client-side reconciler for the counter game
pub fn counter_reconciler(config: ReconcilerConfig) -> CounterReconciler {
    OptimisticReconciler::with_config(
        CounterState::ZERO,
        apply_counter_move as CounterReducer,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_reducer() {
        let actor = ActorId::new(1);
        let state = apply_counter_move(&CounterState::ZERO, &CounterMove::increment(actor, 0));
        assert_eq!(state, CounterState::new(1, 1));

        let state = apply_counter_move(&state, &CounterMove::new(actor, CounterOp::Add(-5), 1));
        assert_eq!(state, CounterState::new(-4, 2));
    }

    #[test]
    fn test_reducer_saturates() {
        let state = CounterState::new(i64::MAX, 3);
        let mv = CounterMove::new(ActorId::new(1), CounterOp::Add(10), 0);
        assert_eq!(apply_counter_move(&state, &mv), CounterState::new(i64::MAX, 4));
    }

    #[test]
    fn test_moves_distinguished_by_timestamp() {
        let actor = ActorId::new(2);
        assert_ne!(CounterMove::increment(actor, 1), CounterMove::increment(actor, 2));
    }
}
