//! Configuration for the stress harness.
//!
//! Every input has a hardcoded default and can be overridden from an
//! optional TOML file and from environment variables (highest priority),
//! e.g. `STRESS__TOPOLOGY__CORE_COUNT=5` or
//! `STRESS__STRESS__DURATION_IN_SECS=120`.

mod monitoring;
mod stress;
mod topology;
pub use monitoring::*;
pub use stress::*;
pub use topology::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct HarnessConfig {
    /// Cluster shape, working directory and backup port bases
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Run duration, pacing and churn timing knobs
    #[serde(default)]
    pub stress: StressConfig,

    /// Prometheus endpoint settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl HarnessConfig {
    /// Load configuration with priority: defaults, then the TOML file
    /// (explicit path, or `config/stress.toml` when present), then
    /// `STRESS__*` environment variables.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        match config_path {
            Some(path) => builder = builder.add_source(File::with_name(path).required(true)),
            None => builder = builder.add_source(File::with_name("config/stress").required(false)),
        }

        builder = builder.add_source(
            Environment::with_prefix("STRESS")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let cfg: HarnessConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates all sections
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        self.stress.validate()?;
        self.monitoring.validate()?;
        Ok(())
    }
}
