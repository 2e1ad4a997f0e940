//! Session simulator - a client reconciler and the authority over chaos links
//!
//! Each tick the client may issue a move, the authority processes whatever
//! reached it, and the client reconciles whatever came back. The fold
//! invariant is checked after every tick; convergence with the authority is
//! checked once both links have drained.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally_core::{MoveId, ReconcileError, Version};
use tally_state::ReconcilerConfig;
use tracing::{debug, warn};

use crate::{
    counter_reconciler, ActorId, ChaosLink, CounterAuthority, CounterLimits, CounterMove,
    CounterOp, CounterReconciler, CounterState, LinkConfig, LinkStats, Verdict,
};

/// Simulation parameters
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Number of ticks during which the client issues moves
    pub ticks: u64,
    /// Simulated time per tick (ms)
    pub tick_ms: u64,
    /// Probability of issuing a move on a tick
    pub move_prob: f64,
    /// Probability that an issued move is a decrement
    pub decrement_prob: f64,
    /// Resync once the oldest pending move is this old (ms)
    pub resync_after_ms: u64,
    /// Client to authority link
    pub uplink: LinkConfig,
    /// Authority to client link
    pub downlink: LinkConfig,
    pub reconciler: ReconcilerConfig,
    pub limits: CounterLimits,
    pub actor: ActorId,
    /// Random seed
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            ticks: 500,
            tick_ms: 10,
            move_prob: 0.3,
            decrement_prob: 0.4,
            resync_after_ms: 1_000,
            uplink: LinkConfig::default(),
            downlink: LinkConfig::default(),
            reconciler: ReconcilerConfig::strict(),
            limits: CounterLimits {
                min: 0,
                max: 20,
                monotonic_time: false,
            },
            actor: ActorId::new(1),
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Short run over a perfect link
    pub fn light() -> Self {
        SimulationConfig {
            ticks: 100,
            uplink: LinkConfig::perfect(),
            downlink: LinkConfig::perfect(),
            ..Default::default()
        }
    }

    /// Long run over a hostile link
    pub fn heavy() -> Self {
        SimulationConfig {
            ticks: 5_000,
            move_prob: 0.6,
            uplink: LinkConfig::hostile(),
            downlink: LinkConfig::hostile(),
            ..Default::default()
        }
    }

    /// Same link conditions in both directions
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.uplink = link.clone();
        self.downlink = link;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Authority response on the downlink
#[derive(Clone, Debug)]
enum Reply {
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

/// Outcome of a simulation run
#[derive(Clone, Debug, Default)]
pub struct SimulationReport {
    pub ticks: u64,
    pub moves_sent: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Responses for moves the client had already dropped
    pub late_replies: u64,
    /// Timeout-driven resyncs during the run
    pub resyncs: u64,
    pub max_pending: usize,
    /// Ticks on which `state != replay()`
    pub invariant_violations: u64,
    /// Client matched the authority after draining, before any final resync
    pub converged_without_resync: bool,
    /// Client matched the authority at the end of the run
    pub converged: bool,
    pub final_state: CounterState,
    pub authority_state: CounterState,
    pub uplink: LinkStats,
    pub downlink: LinkStats,
}

/// Seeded client/authority session
pub struct SessionSimulator {
    config: SimulationConfig,
    rng: StdRng,
    client: CounterReconciler,
    authority: CounterAuthority,
    uplink: ChaosLink<(MoveId, CounterMove)>,
    downlink: ChaosLink<Reply>,
    sent_at: HashMap<MoveId, u64>,
    now_ms: u64,
    report: SimulationReport,
}

impl SessionSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        SessionSimulator {
            rng: StdRng::seed_from_u64(config.seed),
            client: counter_reconciler(config.reconciler.clone()),
            authority: CounterAuthority::new(config.limits),
            uplink: ChaosLink::new(config.uplink.clone(), config.seed.wrapping_add(1)),
            downlink: ChaosLink::new(config.downlink.clone(), config.seed.wrapping_add(2)),
            sent_at: HashMap::new(),
            now_ms: 0,
            report: SimulationReport::default(),
            config,
        }
    }

    pub fn client(&self) -> &CounterReconciler {
        &self.client
    }

    pub fn authority(&self) -> &CounterAuthority {
        &self.authority
    }

    /// Run all ticks, drain both links, and report
    pub fn run(&mut self) -> SimulationReport {
        for _ in 0..self.config.ticks {
            if self.rng.gen::<f64>() < self.config.move_prob {
                self.issue_move();
            }
            self.tick();
        }

        self.drain();

        self.report.converged_without_resync = self.matches_authority();
        if !self.report.converged_without_resync {
            debug!(
                client = ?self.client.state(),
                authority = ?self.authority.state(),
                "not converged after drain, resyncing"
            );
            self.resync();
        }

        self.report.converged = self.matches_authority();
        self.report.final_state = *self.client.state();
        self.report.authority_state = self.authority.state();
        self.report.uplink = self.uplink.stats().clone();
        self.report.downlink = self.downlink.stats().clone();
        self.report.clone()
    }

    fn issue_move(&mut self) {
        let op = if self.rng.gen::<f64>() < self.config.decrement_prob {
            CounterOp::Decrement
        } else {
            CounterOp::Increment
        };
        let mv = CounterMove::new(self.config.actor, op, self.now_ms);

        let id = self.client.apply_optimistic_move(mv);
        self.sent_at.insert(id, self.now_ms);
        self.uplink.send(self.now_ms, (id, mv));

        self.report.moves_sent += 1;
        self.report.max_pending = self.report.max_pending.max(self.client.pending_len());
    }

    fn tick(&mut self) {
        self.now_ms += self.config.tick_ms;
        self.report.ticks += 1;

        for (id, mv) in self.uplink.deliver(self.now_ms) {
            let reply = match self.authority.submit(&mv) {
                Verdict::Accepted { state, version } => Reply::Accepted { id, state, version },
                Verdict::Rejected(reason) => Reply::Rejected {
                    id,
                    reason: reason.to_string(),
                },
            };
            self.downlink.send(self.now_ms, reply);
        }

        for reply in self.downlink.deliver(self.now_ms) {
            self.handle_reply(reply);
        }

        if self.client.replay() != *self.client.state() {
            self.report.invariant_violations += 1;
        }

        self.check_timeout();
    }

    fn handle_reply(&mut self, reply: Reply) {
        match reply {
            Reply::Accepted { id, state, version } => {
                self.sent_at.remove(&id);
                if self.client.confirm_move(id, state, version).is_some() {
                    self.report.accepted += 1;
                } else {
                    self.report.late_replies += 1;
                }
            }
            Reply::Rejected { id, reason } => {
                self.sent_at.remove(&id);
                match self.client.reject_move(id, &reason) {
                    Ok(_) => self.report.rejected += 1,
                    Err(ReconcileError::UnknownMove(_)) => self.report.late_replies += 1,
                    Err(err) => warn!(%err, "unexpected reconcile error"),
                }
            }
        }
    }

    fn check_timeout(&mut self) {
        let Some((id, _)) = self.client.oldest_pending() else {
            return;
        };
        let Some(&sent_at) = self.sent_at.get(&id) else {
            return;
        };

        if self.now_ms.saturating_sub(sent_at) >= self.config.resync_after_ms {
            debug!(move_id = %id, now_ms = self.now_ms, "pending move timed out");
            self.resync();
            self.report.resyncs += 1;
        }
    }

    /// Adopt the authority's current state, as after a reconnect
    fn resync(&mut self) {
        let (state, version) = self.authority.snapshot();
        self.client.sync_with_server(state, version);
        self.sent_at.clear();
    }

    /// Tick without issuing moves until both links are idle
    fn drain(&mut self) {
        while !(self.uplink.is_idle() && self.downlink.is_idle()) {
            self.tick();
        }
    }

    fn matches_authority(&self) -> bool {
        !self.client.has_pending_moves()
            && *self.client.state() == self.authority.state()
            && self.client.version() == self.authority.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_state::VersionPolicy;

    #[test]
    fn test_perfect_link_converges() {
        let report = SessionSimulator::new(SimulationConfig::light()).run();

        assert!(report.moves_sent > 0);
        assert_eq!(report.invariant_violations, 0);
        assert_eq!(report.resyncs, 0);
        assert_eq!(report.late_replies, 0);
        assert!(report.converged_without_resync);
        assert_eq!(report.accepted + report.rejected, report.moves_sent);
    }

    #[test]
    fn test_trust_policy_converges_on_fifo_link() {
        let config = SimulationConfig {
            reconciler: ReconcilerConfig::default(),
            ..SimulationConfig::light()
        };
        let report = SessionSimulator::new(config).run();

        assert!(report.converged_without_resync);
        assert_eq!(report.final_state, report.authority_state);
    }

    #[test]
    fn test_reordering_converges_with_ignore_stale() {
        for seed in 0..8 {
            let config = SimulationConfig::default()
                .with_link(LinkConfig::poor().lossless())
                .with_seed(seed);
            assert_eq!(config.reconciler.version_policy, VersionPolicy::IgnoreStale);

            let report = SessionSimulator::new(config).run();
            assert_eq!(report.invariant_violations, 0, "seed {seed}");
            assert!(report.converged_without_resync, "seed {seed}");
        }
    }

    #[test]
    fn test_good_link_matches_client_stats() {
        let config = SimulationConfig::default()
            .with_link(LinkConfig::good())
            .with_seed(7);
        let mut sim = SessionSimulator::new(config);
        let report = sim.run();

        assert_eq!(report.invariant_violations, 0);
        assert!(report.converged);
        assert_eq!(*sim.client().state(), sim.authority().state());
        assert_eq!(sim.client().version(), sim.authority().version());

        let stats = sim.client().stats();
        assert_eq!(stats.applied, report.moves_sent);
        assert_eq!(stats.accepted, report.accepted);
        assert_eq!(stats.rejected, report.rejected);
        assert_eq!(stats.unmatched, report.late_replies);
    }

    #[test]
    fn test_hostile_link_recovers() {
        let config = SimulationConfig {
            ticks: 1_000,
            ..SimulationConfig::heavy()
        };
        let report = SessionSimulator::new(config).run();

        assert_eq!(report.invariant_violations, 0);
        assert!(report.converged);
        assert!(report.uplink.lost + report.downlink.lost > 0);
    }
}
