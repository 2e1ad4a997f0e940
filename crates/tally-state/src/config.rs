//! Reconciler configuration

/// How acceptances carrying an old version are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Adopt every acknowledged state and version as delivered
    #[default]
    Trust,
    /// An acceptance whose version is not newer than the current one only
    /// dequeues its move; confirmed state and version are kept
    IgnoreStale,
}

/// Optimistic reconciler configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound enforced by `try_apply_optimistic_move`
    pub max_pending: Option<usize>,
    /// Stale acknowledgement handling
    pub version_policy: VersionPolicy,
}

impl ReconcilerConfig {
    /// Bounded queue, stale acknowledgements ignored.
    ///
    /// Suited to transports that may reorder or duplicate responses.
    pub fn strict() -> Self {
        ReconcilerConfig {
            max_pending: Some(64),
            version_policy: VersionPolicy::IgnoreStale,
        }
    }

    pub fn with_max_pending(mut self, limit: usize) -> Self {
        self.max_pending = Some(limit);
        self
    }

    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_trusts_versions() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.max_pending, None);
        assert_eq!(config.version_policy, VersionPolicy::Trust);
    }

    #[test]
    fn test_builder() {
        let config = ReconcilerConfig::default()
            .with_max_pending(3)
            .with_version_policy(VersionPolicy::IgnoreStale);
        assert_eq!(config.max_pending, Some(3));
        assert_eq!(config, ReconcilerConfig::strict().with_max_pending(3));
    }
}
