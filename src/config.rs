use std::time::Duration;

/// Backoff parameters for remote fetches.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(attempts) = std::env::var("SYNC_RETRY_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.max_attempts = attempts;
            }
        }
        if let Ok(delay) = std::env::var("SYNC_RETRY_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                config.initial_delay = Duration::from_millis(ms);
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(config.initial_delay < config.max_delay);
        assert!(config.backoff_multiplier > 1.0);
    }
}
