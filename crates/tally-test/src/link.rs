//! Chaos link between a client and the authority
//!
//! Simulates the transport a reconciler sits behind:
//! - Latency and jitter
//! - Reordering
//! - Loss
//!
//! Time is simulated in milliseconds; nothing sleeps.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Link conditions
#[derive(Clone, Debug)]
pub struct LinkConfig {
    /// Base one-way latency (ms)
    pub base_latency_ms: u64,
    /// Uniform jitter added on top of the base latency (ms)
    pub jitter_ms: u64,
    /// Probability a message is held back long enough to overtake
    pub reorder_prob: f64,
    /// Extra delay applied to reordered messages (ms)
    pub reorder_delay_ms: u64,
    /// Loss rate (0.0 - 1.0)
    pub loss_rate: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            base_latency_ms: 50,
            jitter_ms: 20,
            reorder_prob: 0.05,
            reorder_delay_ms: 80,
            loss_rate: 0.01,
        }
    }
}

impl LinkConfig {
    /// Fixed latency, FIFO, lossless
    pub fn perfect() -> Self {
        LinkConfig {
            base_latency_ms: 30,
            jitter_ms: 0,
            reorder_prob: 0.0,
            reorder_delay_ms: 0,
            loss_rate: 0.0,
        }
    }

    /// Good network conditions
    pub fn good() -> Self {
        LinkConfig {
            base_latency_ms: 20,
            jitter_ms: 10,
            reorder_prob: 0.01,
            reorder_delay_ms: 30,
            loss_rate: 0.0,
        }
    }

    /// Poor network conditions
    pub fn poor() -> Self {
        LinkConfig {
            base_latency_ms: 100,
            jitter_ms: 80,
            reorder_prob: 0.15,
            reorder_delay_ms: 150,
            loss_rate: 0.03,
        }
    }

    /// Hostile network conditions
    pub fn hostile() -> Self {
        LinkConfig {
            base_latency_ms: 200,
            jitter_ms: 200,
            reorder_prob: 0.3,
            reorder_delay_ms: 400,
            loss_rate: 0.1,
        }
    }

    /// Same latency profile with loss disabled
    pub fn lossless(mut self) -> Self {
        self.loss_rate = 0.0;
        self
    }
}

/// Message in flight
#[derive(Clone, Debug)]
struct InFlight<T> {
    payload: T,
    sent_at_ms: u64,
    deliver_at_ms: u64,
    seq: u64,
}

/// Link statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub delivered: u64,
    pub lost: u64,
    pub reordered: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl LinkStats {
    pub fn loss_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.lost as f64 / self.sent as f64
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.total_latency_ms as f64 / self.delivered as f64
        }
    }
}

/// One-directional chaos link
pub struct ChaosLink<T> {
    config: LinkConfig,
    rng: StdRng,
    jitter: Uniform<u64>,
    in_flight: Vec<InFlight<T>>,
    next_seq: u64,
    stats: LinkStats,
}

impl<T> ChaosLink<T> {
    pub fn new(config: LinkConfig, seed: u64) -> Self {
        let jitter = Uniform::new_inclusive(0, config.jitter_ms);
        ChaosLink {
            config,
            rng: StdRng::seed_from_u64(seed),
            jitter,
            in_flight: Vec::new(),
            next_seq: 0,
            stats: LinkStats::default(),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Messages still in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Send a message at time `now_ms`. Returns false if it was lost.
    pub fn send(&mut self, now_ms: u64, payload: T) -> bool {
        self.stats.sent += 1;

        if self.config.loss_rate > 0.0 && self.rng.gen::<f64>() < self.config.loss_rate {
            self.stats.lost += 1;
            return false;
        }

        let mut delay = self.config.base_latency_ms + self.jitter.sample(&mut self.rng);
        if self.config.reorder_prob > 0.0 && self.rng.gen::<f64>() < self.config.reorder_prob {
            delay += self.config.reorder_delay_ms;
            self.stats.reordered += 1;
        }

        self.in_flight.push(InFlight {
            payload,
            sent_at_ms: now_ms,
            deliver_at_ms: now_ms + delay,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        true
    }

    /// Deliver every message due at or before `now_ms`
    ///
    /// Messages come out ordered by delivery time, ties by send order.
    pub fn deliver(&mut self, now_ms: u64) -> Vec<T> {
        let (mut due, waiting): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|msg| msg.deliver_at_ms <= now_ms);
        self.in_flight = waiting;

        due.sort_by_key(|msg| (msg.deliver_at_ms, msg.seq));
        due.into_iter()
            .map(|msg| {
                let latency = msg.deliver_at_ms - msg.sent_at_ms;
                self.stats.delivered += 1;
                self.stats.total_latency_ms += latency;
                self.stats.max_latency_ms = self.stats.max_latency_ms.max(latency);
                msg.payload
            })
            .collect()
    }

    /// Time the next message becomes deliverable
    pub fn next_delivery_ms(&self) -> Option<u64> {
        self.in_flight.iter().map(|msg| msg.deliver_at_ms).min()
    }
}
