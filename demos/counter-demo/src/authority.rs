//! Authority task with simulated one-way latency

use std::time::Duration;

use tally_core::{MoveId, Version};
use tally_test::{CounterAuthority, CounterLimits, CounterMove, CounterState, Verdict};
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum AuthorityRequest {
    Submit {
        id: MoveId,
        mv: CounterMove,
    },
    Snapshot {
        reply: oneshot::Sender<(CounterState, Version)>,
    },
}

#[derive(Debug)]
pub enum AuthorityResponse {
    Accepted {
        id: MoveId,
        state: CounterState,
        version: Version,
    },
    Rejected {
        id: MoveId,
        reason: String,
    },
}

/// Start the authority. Requests are processed in send order, each no
/// earlier than `latency` after it was sent.
pub fn spawn_authority(
    limits: CounterLimits,
    latency: Duration,
) -> (mpsc::Sender<AuthorityRequest>, mpsc::Receiver<AuthorityResponse>) {
    let (request_tx, mut request_rx) = mpsc::channel::<AuthorityRequest>(CHANNEL_CAPACITY);
    let (delayed_tx, mut delayed_rx) =
        mpsc::channel::<(Instant, AuthorityRequest)>(CHANNEL_CAPACITY);
    let (response_tx, response_rx) = mpsc::channel(CHANNEL_CAPACITY);

    // Wire: stamp each request with its arrival time
    tokio::spawn(async move {
        while let Some(request) = request_rx.recv().await {
            if delayed_tx.send((Instant::now() + latency, request)).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut authority = CounterAuthority::new(limits);

        while let Some((arrive_at, request)) = delayed_rx.recv().await {
            tokio::time::sleep_until(arrive_at).await;

            match request {
                AuthorityRequest::Submit { id, mv } => {
                    let response = match authority.submit(&mv) {
                        Verdict::Accepted { state, version } => {
                            AuthorityResponse::Accepted { id, state, version }
                        }
                        Verdict::Rejected(reason) => AuthorityResponse::Rejected {
                            id,
                            reason: reason.to_string(),
                        },
                    };

                    let response_tx = response_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(latency).await;
                        let _ = response_tx.send(response).await;
                    });
                }
                AuthorityRequest::Snapshot { reply } => {
                    debug!(version = %authority.version(), "snapshot requested");
                    let _ = reply.send(authority.snapshot());
                }
            }
        }
    });

    (request_tx, response_rx)
}
