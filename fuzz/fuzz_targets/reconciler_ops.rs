#![no_main]

//! Drives arbitrary operation sequences through the reconciler and checks
//! the fold invariant after each one.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tally_core::{MoveId, Reducer, Version};
use tally_state::{OptimisticReconciler, ReconcilerConfig, VersionPolicy};

#[derive(Arbitrary, Debug, Clone, Copy, PartialEq)]
struct Move {
    actor: u8,
    delta: i16,
}

#[derive(Arbitrary, Debug)]
enum Op {
    Apply(Move),
    TryApply(Move),
    AcceptValue { state: i64, version: u16, mv: Move },
    RejectValue(Move),
    Confirm { id: u8, state: i64, version: u16 },
    Reject { id: u8 },
    Sync { state: i64, version: u16 },
    Reset,
}

#[derive(Arbitrary, Debug)]
struct Input {
    ignore_stale: bool,
    max_pending: Option<u8>,
    ops: Vec<Op>,
}

fn apply(state: &i64, mv: &Move) -> i64 {
    state.wrapping_add(mv.delta as i64)
}

fuzz_target!(|input: Input| {
    let policy = if input.ignore_stale {
        VersionPolicy::IgnoreStale
    } else {
        VersionPolicy::Trust
    };
    let mut config = ReconcilerConfig::default().with_version_policy(policy);
    config.max_pending = input.max_pending.map(usize::from);

    let mut r = OptimisticReconciler::with_config(0i64, apply as fn(&i64, &Move) -> i64, config);

    for op in input.ops {
        match op {
            Op::Apply(mv) => {
                r.apply_optimistic_move(mv);
            }
            Op::TryApply(mv) => {
                let before = r.pending_len();
                if r.try_apply_optimistic_move(mv).is_err() {
                    assert_eq!(r.pending_len(), before);
                }
            }
            Op::AcceptValue { state, version, mv } => {
                r.handle_move_accepted(state, Version::new(version.into()), &mv)
            }
            Op::RejectValue(mv) => r.handle_move_rejected("fuzz", &mv),
            Op::Confirm { id, state, version } => {
                r.confirm_move(MoveId::new(id.into()), state, Version::new(version.into()));
            }
            Op::Reject { id } => {
                let id = MoveId::new(id.into());
                let was_pending = r.is_pending(id);
                assert_eq!(r.reject_move(id, "fuzz").is_ok(), was_pending);
            }
            Op::Sync { state, version } => {
                r.sync_with_server(state, Version::new(version.into()));
                assert!(!r.has_pending_moves());
                assert_eq!(*r.state(), state);
            }
            Op::Reset => r.reset(),
        }

        let pending: Vec<Move> = r.pending_moves().map(|(_, mv)| *mv).collect();
        assert_eq!(*r.state(), apply.fold(r.confirmed_state(), &pending));
    }
});
