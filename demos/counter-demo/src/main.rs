//! Tally Counter Demo
//!
//! One optimistic client plays the counter game against an authority task
//! over tokio channels with simulated latency:
//! - Moves show up in the local view immediately
//! - Accepted moves fold into the confirmed state
//! - Rejected moves roll back
//! - A reconnect resyncs from the authority snapshot
//!
//! Set `RUST_LOG=debug` to watch every reconciliation step.

mod authority;

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally_state::{Callbacks, ReconcilerConfig, SharedReconciler};
use tally_test::{
    apply_counter_move, ActorId, CounterLimits, CounterMove, CounterOp, CounterReducer,
    CounterState,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use authority::{spawn_authority, AuthorityRequest, AuthorityResponse};

const MOVES: u64 = 40;
const MOVE_INTERVAL: Duration = Duration::from_millis(25);
const RECONNECT_AFTER: u64 = 25;

type DemoReconciler = SharedReconciler<CounterState, CounterMove, CounterReducer>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║        Tally Counter Demo - Optimistic Reconciliation      ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();

    let limits = CounterLimits {
        min: 0,
        max: 10,
        monotonic_time: false,
    };
    let (requests, responses) = spawn_authority(limits, Duration::from_millis(60));

    let callbacks = Callbacks::new()
        .on_move_accepted(|state: &CounterState, mv: &CounterMove| {
            info!(op = ?mv.op, value = state.value, "authority accepted");
        })
        .on_move_rejected(|reason: &str, mv: &CounterMove| {
            warn!(op = ?mv.op, reason, "authority rejected, rolled back");
        });
    let reconciler: DemoReconciler = SharedReconciler::from_initial(
        CounterState::ZERO,
        apply_counter_move as CounterReducer,
        ReconcilerConfig::strict(),
    );
    reconciler.with(|r| r.set_callbacks(callbacks));

    let receiver = tokio::spawn(receive_loop(reconciler.clone(), responses));

    let mut rng = StdRng::seed_from_u64(7);
    let actor = ActorId::new(1);
    let started = tokio::time::Instant::now();

    for n in 0..MOVES {
        let op = if rng.gen_bool(0.35) {
            CounterOp::Decrement
        } else {
            CounterOp::Increment
        };
        let at_ms = started.elapsed().as_millis() as u64;
        let mv = CounterMove::new(actor, op, at_ms);

        match reconciler.try_apply_optimistic_move(mv) {
            Ok(id) => {
                requests.send(AuthorityRequest::Submit { id, mv }).await?;
                info!(
                    move_id = %id,
                    op = ?op,
                    predicted = reconciler.snapshot().value,
                    "move sent"
                );
            }
            Err(err) => warn!(%err, "move not sent"),
        }

        if n == RECONNECT_AFTER {
            resync(&reconciler, &requests).await?;
        }

        tokio::time::sleep(MOVE_INTERVAL).await;
    }

    // Let the last responses arrive
    while reconciler.has_pending_moves() {
        tokio::time::sleep(MOVE_INTERVAL).await;
    }
    resync(&reconciler, &requests).await?;

    drop(requests);
    receiver.await?;

    let stats = reconciler.stats();
    println!();
    println!("Final state:   {:?}", reconciler.snapshot());
    println!("Version:       {}", reconciler.version());
    println!(
        "Applied {} / accepted {} / rejected {} / resyncs {} / dropped {}",
        stats.applied, stats.accepted, stats.rejected, stats.resyncs, stats.dropped_on_resync
    );

    Ok(())
}

/// Reconcile authority responses as they arrive
async fn receive_loop(
    reconciler: DemoReconciler,
    mut responses: mpsc::Receiver<AuthorityResponse>,
) {
    while let Some(response) = responses.recv().await {
        match response {
            AuthorityResponse::Accepted { id, state, version } => {
                reconciler.confirm_move(id, state, version);
            }
            AuthorityResponse::Rejected { id, reason } => {
                if let Err(err) = reconciler.reject_move(id, &reason) {
                    warn!(%err, "late rejection ignored");
                }
            }
        }
    }
}

/// Simulated reconnect: fetch the authority snapshot and resync
async fn resync(
    reconciler: &DemoReconciler,
    requests: &mpsc::Sender<AuthorityRequest>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (reply, snapshot) = oneshot::channel();
    requests.send(AuthorityRequest::Snapshot { reply }).await?;
    let (state, version) = snapshot.await?;

    info!(value = state.value, %version, "resyncing from authority snapshot");
    reconciler.sync_with_server(state, version);
    Ok(())
}
