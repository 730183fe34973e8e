use std::{path::PathBuf, time::Duration};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Upper bound accepted for the grace period.
pub const MAX_GRACE_PERIOD: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Task working directories are resolved against this.
    pub project_root: PathBuf,
    /// How long terminated children get before they are force-killed.
    pub grace_period: Duration,
    pub poll_interval: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}
