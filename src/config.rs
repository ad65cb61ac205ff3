//! Settings for the application facades.

use std::time::Duration;

/// How long shared states keep their live query running after the last
/// subscriber leaves.
pub const DEFAULT_IDLE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// The config for [MemberManager](crate::MemberManager) and
/// [ContributionManager](crate::ContributionManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// How long a shared state keeps re-querying with no subscribers before
    /// it stops. Resubscribing restarts it.
    pub idle_grace_period: Duration,
}

impl ManagerConfig {
    /// Set the idle grace period.
    pub fn with_idle_grace_period(mut self, idle_grace_period: Duration) -> Self {
        self.idle_grace_period = idle_grace_period;
        self
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_grace_period: DEFAULT_IDLE_GRACE_PERIOD,
        }
    }
}
