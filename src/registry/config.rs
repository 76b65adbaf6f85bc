//! Registry configuration

/// What to do when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Discard the oldest queued message to make room
    #[default]
    DropOldest,
    /// Discard the incoming message
    DropNewest,
    /// Evict the subscriber
    Disconnect,
}

/// Configuration for the subscriber registry
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Maximum messages queued per subscriber (0 = unbounded)
    pub max_queue_depth: usize,

    /// Applied when a queue reaches `max_queue_depth`
    pub overflow_policy: OverflowPolicy,
}

impl RegistryConfig {
    /// Bound every subscriber queue to `depth` messages (0 = unbounded)
    pub fn max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = RegistryConfig::default();

        assert_eq!(config.max_queue_depth, 0);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .max_queue_depth(128)
            .overflow_policy(OverflowPolicy::Disconnect);

        assert_eq!(config.max_queue_depth, 128);
        assert_eq!(config.overflow_policy, OverflowPolicy::Disconnect);
    }

    #[test]
    fn test_policy_cli_names() {
        use clap::ValueEnum;

        let policy = OverflowPolicy::from_str("drop-newest", false).unwrap();
        assert_eq!(policy, OverflowPolicy::DropNewest);
        assert!(OverflowPolicy::from_str("disconnect", false).is_ok());
        assert!(OverflowPolicy::from_str("block", false).is_err());
    }
}
