use std::time::Duration;

/// Default bound on a single collaborator call.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on every individual collaborator call. A call that
    /// exceeds it fails like any other transport error.
    pub collaborator_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}
