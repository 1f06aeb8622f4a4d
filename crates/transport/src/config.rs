//! Transport tuning knobs, mirroring the environment keys in `ActorConfig`.

/// Parameters controlling resend/ack behavior and fault injection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whether data messages carry `message_id` and require an `Ack`.
    pub is_resending_enabled: bool,

    /// Time to wait for an `Ack` before retransmitting (milliseconds).
    pub resending_timeout_ms: u64,

    /// Maximum number of retransmit attempts before giving up.
    pub resending_retry: u32,

    /// Probability (0..1) that an outbound send is silently dropped.
    /// Fault-injection only; must be 0 in production.
    pub drop_rate: f64,

    /// Retry count for the initial listener bind.
    pub bind_retry: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            is_resending_enabled: false,
            resending_timeout_ms: 1_000,
            resending_retry: 5,
            drop_rate: 0.0,
            bind_retry: 3,
        }
    }
}

impl TransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resending(mut self, timeout_ms: u64, retry: u32) -> Self {
        self.is_resending_enabled = true;
        self.resending_timeout_ms = timeout_ms;
        self.resending_retry = retry;
        self
    }

    pub fn with_drop_rate(mut self, drop_rate: f64) -> Self {
        self.drop_rate = drop_rate;
        self
    }

    /// Configuration tuned for fault-injection tests: aggressive resend,
    /// a nonzero drop rate.
    pub fn for_testing(drop_rate: f64) -> Self {
        TransportConfig {
            is_resending_enabled: true,
            resending_timeout_ms: 50,
            resending_retry: 20,
            drop_rate,
            bind_retry: 3,
        }
    }

    pub fn validate(&self) -> Result<(), TransportConfigError> {
        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(TransportConfigError::DropRateOutOfRange(self.drop_rate));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportConfigError {
    #[error("drop_rate must be within [0, 1], got {0}")]
    DropRateOutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_disables_resending() {
        let config = TransportConfig::default();
        assert!(!config.is_resending_enabled);
        assert_eq!(config.drop_rate, 0.0);
    }

    #[test]
    fn for_testing_enables_resending_with_given_drop_rate() {
        let config = TransportConfig::for_testing(0.3);
        assert!(config.is_resending_enabled);
        assert_eq!(config.drop_rate, 0.3);
    }

    #[test]
    fn validate_rejects_out_of_range_drop_rate() {
        let config = TransportConfig::new().with_drop_rate(1.5);
        assert!(matches!(
            config.validate(),
            Err(TransportConfigError::DropRateOutOfRange(_))
        ));
    }
}
