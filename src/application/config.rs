use std::num::NonZeroUsize;

/// Number of workers used when none is configured.
pub const DEFAULT_WORKERS: NonZeroUsize = NonZeroUsize::new(3).unwrap();

/// What a settlement cycle does after one transfer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Record the failure and keep applying the rest of the batch.
    #[default]
    ContinueOnError,
    /// Stop applying transfers after the first failure. Requests not yet
    /// applied are reported as `Aborted`.
    FailFast,
}

/// Settings fixed when a `SettlementEngine` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: NonZeroUsize,
    pub failure_policy: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}
