//! In-process authority for the counter game
//!
//! Plays the server side of a session: validates each submitted move
//! against the board limits and bumps the version on every acceptance.

use tally_core::Version;
use thiserror::Error;
use tracing::debug;

use crate::{apply_counter_move, CounterMove, CounterState};

/// Why the authority refused a move
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Invalid move: value {value} outside {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("Invalid move: timestamp {at_ms} precedes last accepted {last_ms}")]
    StaleTimestamp { at_ms: u64, last_ms: u64 },
}

/// Authority verdict for one submitted move
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted {
        state: CounterState,
        version: Version,
    },
    Rejected(RejectReason),
}

/// Board limits enforced by the authority
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterLimits {
    pub min: i64,
    pub max: i64,
    /// Refuse moves stamped earlier than the last accepted one
    pub monotonic_time: bool,
}

impl Default for CounterLimits {
    fn default() -> Self {
        CounterLimits {
            min: 0,
            max: 100,
            monotonic_time: false,
        }
    }
}

impl CounterLimits {
    pub fn unbounded() -> Self {
        CounterLimits {
            min: i64::MIN,
            max: i64::MAX,
            monotonic_time: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorityStats {
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Authoritative counter
#[derive(Clone, Debug)]
pub struct CounterAuthority {
    state: CounterState,
    version: Version,
    limits: CounterLimits,
    last_accepted_ms: u64,
    stats: AuthorityStats,
}

impl CounterAuthority {
    pub fn new(limits: CounterLimits) -> Self {
        CounterAuthority {
            state: CounterState::ZERO,
            version: Version::INITIAL,
            limits,
            last_accepted_ms: 0,
            stats: AuthorityStats::default(),
        }
    }

    pub fn state(&self) -> CounterState {
        self.state
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Current state and version, as a reconnecting client would fetch them
    pub fn snapshot(&self) -> (CounterState, Version) {
        (self.state, self.version)
    }

    pub fn stats(&self) -> &AuthorityStats {
        &self.stats
    }

    /// Validate and apply a move
    pub fn submit(&mut self, mv: &CounterMove) -> Verdict {
        self.stats.submitted += 1;

        match self.validate(mv) {
            Ok(next) => {
                self.state = next;
                self.version = self.version.next();
                self.last_accepted_ms = self.last_accepted_ms.max(mv.at_ms);
                self.stats.accepted += 1;
                Verdict::Accepted {
                    state: next,
                    version: self.version,
                }
            }
            Err(reason) => {
                debug!(actor = ?mv.actor, %reason, "authority refused move");
                self.stats.rejected += 1;
                Verdict::Rejected(reason)
            }
        }
    }

    fn validate(&self, mv: &CounterMove) -> Result<CounterState, RejectReason> {
        if self.limits.monotonic_time && mv.at_ms < self.last_accepted_ms {
            return Err(RejectReason::StaleTimestamp {
                at_ms: mv.at_ms,
                last_ms: self.last_accepted_ms,
            });
        }

        let next = apply_counter_move(&self.state, mv);
        if next.value < self.limits.min || next.value > self.limits.max {
            return Err(RejectReason::OutOfRange {
                value: next.value,
                min: self.limits.min,
                max: self.limits.max,
            });
        }
        Ok(next)
    }
}

impl Default for CounterAuthority {
    fn default() -> Self {
        Self::new(CounterLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ActorId;

    #[test]
    fn test_accept_bumps_version() {
        let mut authority = CounterAuthority::default();
        let verdict = authority.submit(&CounterMove::increment(ActorId::new(1), 0));

        assert_eq!(
            verdict,
            Verdict::Accepted {
                state: CounterState::new(1, 1),
                version: Version::new(2),
            }
        );
        assert_eq!(authority.snapshot(), (CounterState::new(1, 1), Version::new(2)));
    }

    #[test]
    fn test_reject_below_min() {
        let mut authority = CounterAuthority::default();
        let verdict = authority.submit(&CounterMove::decrement(ActorId::new(1), 0));

        assert_eq!(
            verdict,
            Verdict::Rejected(RejectReason::OutOfRange {
                value: -1,
                min: 0,
                max: 100
            })
        );
        assert_eq!(authority.version(), Version::INITIAL);
        assert_eq!(authority.stats().rejected, 1);
    }

    #[test]
    fn test_monotonic_time() {
        let mut authority = CounterAuthority::new(CounterLimits {
            monotonic_time: true,
            ..CounterLimits::unbounded()
        });
        let actor = ActorId::new(1);

        assert!(matches!(
            authority.submit(&CounterMove::increment(actor, 10)),
            Verdict::Accepted { .. }
        ));
        assert!(matches!(
            authority.submit(&CounterMove::increment(actor, 5)),
            Verdict::Rejected(RejectReason::StaleTimestamp { .. })
        ));
    }
}
