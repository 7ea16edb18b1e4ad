use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Timing knobs for the stress run and the three workers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StressConfig {
    /// Total run length; the run also ends early when any worker trips
    /// the failure signal
    #[serde(default = "default_duration_in_secs")]
    pub duration_in_secs: u64,

    /// Pause between write workload iterations
    #[serde(default = "default_workload_pacing_in_ms")]
    pub workload_pacing_in_ms: u64,

    /// How long a churned member stays down before it is restarted
    #[serde(default = "default_churn_pause_in_ms")]
    pub churn_pause_in_ms: u64,

    /// Bound on how long a restarted member may take to rejoin
    #[serde(default = "default_rejoin_timeout_in_secs")]
    pub rejoin_timeout_in_secs: u64,

    /// Poll interval while waiting for a member to rejoin
    #[serde(default = "default_rejoin_poll_interval_in_ms")]
    pub rejoin_poll_interval_in_ms: u64,

    /// Pause between backup attempts
    #[serde(default = "default_backup_pacing_in_ms")]
    pub backup_pacing_in_ms: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duration_in_secs: default_duration_in_secs(),
            workload_pacing_in_ms: default_workload_pacing_in_ms(),
            churn_pause_in_ms: default_churn_pause_in_ms(),
            rejoin_timeout_in_secs: default_rejoin_timeout_in_secs(),
            rejoin_poll_interval_in_ms: default_rejoin_poll_interval_in_ms(),
            backup_pacing_in_ms: default_backup_pacing_in_ms(),
        }
    }
}

impl StressConfig {
    /// Validates stress timing configuration
    pub fn validate(&self) -> Result<()> {
        if self.duration_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "duration_in_secs must be at least 1".into(),
            )));
        }

        if self.rejoin_timeout_in_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "rejoin_timeout_in_secs must be at least 1".into(),
            )));
        }

        if self.rejoin_poll_interval_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "rejoin_poll_interval_in_ms must be at least 1".into(),
            )));
        }

        if Duration::from_millis(self.rejoin_poll_interval_in_ms) > self.rejoin_timeout() {
            return Err(Error::Config(ConfigError::Message(
                "rejoin_poll_interval_in_ms exceeds rejoin_timeout_in_secs, the member would never be polled".into(),
            )));
        }

        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_in_secs)
    }

    pub fn workload_pacing(&self) -> Duration {
        Duration::from_millis(self.workload_pacing_in_ms)
    }

    pub fn churn_pause(&self) -> Duration {
        Duration::from_millis(self.churn_pause_in_ms)
    }

    pub fn rejoin_timeout(&self) -> Duration {
        Duration::from_secs(self.rejoin_timeout_in_secs)
    }

    pub fn rejoin_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rejoin_poll_interval_in_ms)
    }

    pub fn backup_pacing(&self) -> Duration {
        Duration::from_millis(self.backup_pacing_in_ms)
    }
}

// 30 minutes, matching a soak-length run; CI overrides this down
fn default_duration_in_secs() -> u64 {
    1800
}
fn default_workload_pacing_in_ms() -> u64 {
    10
}
fn default_churn_pause_in_ms() -> u64 {
    500
}
fn default_rejoin_timeout_in_secs() -> u64 {
    60
}
fn default_rejoin_poll_interval_in_ms() -> u64 {
    250
}
fn default_backup_pacing_in_ms() -> u64 {
    100
}
