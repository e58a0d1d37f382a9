//! Pool configuration.

use crate::error::PoolError;

/// Configuration for an [`ExecutionPool`].
///
/// [`ExecutionPool`]: crate::ExecutionPool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker threads the pool spawns. Must be at least 2: a pool
    /// with a single worker adds nothing over a standalone serial queue and
    /// is rejected at construction.
    pub worker_count: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            worker_count: default_worker_count(),
        }
    }
}

impl PoolConfig {
    /// Config with an explicit worker count.
    pub fn with_worker_count(worker_count: usize) -> Self {
        PoolConfig { worker_count }
    }

    pub(crate) fn validate(&self) -> Result<(), PoolError> {
        match self.worker_count {
            0 => Err(PoolError::NoWorkers),
            1 => Err(PoolError::SingleWorker),
            _ => Ok(()),
        }
    }
}

/// Hardware-derived default: one worker per logical CPU, but never fewer
/// than 4 so small machines still get real concurrency.
pub(crate) fn default_worker_count() -> usize {
    num_cpus::get().max(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_worker_count_floor() {
        assert!(default_worker_count() >= 4);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = PoolConfig::with_worker_count(0);
        assert_eq!(config.validate(), Err(PoolError::NoWorkers));
    }

    #[test]
    fn test_rejects_single_worker() {
        let config = PoolConfig::with_worker_count(1);
        assert_eq!(config.validate(), Err(PoolError::SingleWorker));
    }

    #[test]
    fn test_accepts_two_workers() {
        let config = PoolConfig::with_worker_count(2);
        assert!(config.validate().is_ok());
    }
}
