//! Benchmarks for optimistic reconciliation

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tally_core::Version;
use tally_state::ReconcilerConfig;
use tally_test::{
    counter_reconciler, ActorId, CounterMove, CounterReconciler, CounterState, SessionSimulator,
    SimulationConfig,
};

fn with_pending(n: u64) -> CounterReconciler {
    let mut r = counter_reconciler(ReconcilerConfig::default());
    let actor = ActorId::new(1);
    for t in 0..n {
        r.apply_optimistic_move(CounterMove::increment(actor, t));
    }
    r
}

fn bench_apply_optimistic_move(c: &mut Criterion) {
    let actor = ActorId::new(1);

    c.bench_function("apply_optimistic_move", |b| {
        b.iter_batched(
            || counter_reconciler(ReconcilerConfig::default()),
            |mut r| {
                for t in 0..64 {
                    r.apply_optimistic_move(black_box(CounterMove::increment(actor, t)));
                }
                r
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_accept_oldest(c: &mut Criterion) {
    c.bench_function("confirm_oldest_of_64", |b| {
        b.iter_batched(
            || with_pending(64),
            |mut r| {
                let id = r.oldest_pending().map(|(id, _)| id);
                if let Some(id) = id {
                    r.confirm_move(black_box(id), CounterState::new(1, 1), Version::new(2));
                }
                r
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_reject_by_value(c: &mut Criterion) {
    let target = CounterMove::increment(ActorId::new(1), 32);

    c.bench_function("reject_middle_of_64_by_value", |b| {
        b.iter_batched(
            || with_pending(64),
            |mut r| {
                r.handle_move_rejected("refused", black_box(&target));
                r
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_session_simulation(c: &mut Criterion) {
    c.bench_function("session_light", |b| {
        b.iter(|| black_box(SessionSimulator::new(SimulationConfig::light()).run()))
    });
}

criterion_group!(
    benches,
    bench_apply_optimistic_move,
    bench_accept_oldest,
    bench_reject_by_value,
    bench_session_simulation,
);
criterion_main!(benches);
