use std::path::Path;

use cluster_stress::setting_keys;
use cluster_stress::HarnessConfig;
use cluster_stress::InstanceSettings;
use cluster_stress::MemberClass;
use cluster_stress::TopologyConfig;

/// Configuration for a CI-length run: the soak scenario's full topology
/// (3 cores + 1 edge) with the timings tightened so a test finishes in
/// seconds.
#[allow(dead_code)]
pub fn short_run_config(working_dir: &Path, duration_in_secs: u64) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.topology.working_dir = working_dir.to_path_buf();
    config.topology.core_count = 3;
    config.topology.edge_count = 1;
    config.stress.duration_in_secs = duration_in_secs;
    config.stress.workload_pacing_in_ms = 2;
    config.stress.churn_pause_in_ms = 20;
    config.stress.rejoin_timeout_in_secs = 10;
    config.stress.rejoin_poll_interval_in_ms = 10;
    config.stress.backup_pacing_in_ms = 5;
    config.validate().expect("test configuration is valid");
    config
}

/// Per-instance settings the way the harness wires them for one member
/// class, for tests that construct the cluster themselves.
#[allow(dead_code)]
pub fn backup_settings(topology: &TopologyConfig, class: MemberClass) -> InstanceSettings {
    let topology = topology.clone();
    let mut settings = InstanceSettings::new();
    settings.set_shared(setting_keys::BACKUP_ENABLED, "true");
    settings.set_per_instance(setting_keys::BACKUP_ADDRESS, move |index| {
        topology.backup_address(class, index).to_string()
    });
    settings
}
