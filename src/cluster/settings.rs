use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

/// Setting keys understood by cluster members. Anything else injected
/// through [`InstanceSettings`] is persisted verbatim with the member's
/// state and otherwise ignored by the in-process implementation.
pub mod setting_keys {
    pub const BACKUP_ENABLED: &str = "backup_enabled";
    pub const BACKUP_ADDRESS: &str = "backup_address";
    pub const LOG_ROTATION_SIZE: &str = "log_rotation_size";
    pub const LOG_PRUNING_INTERVAL: &str = "log_pruning_interval";
    pub const LOG_PRUNING_STRATEGY: &str = "log_pruning_strategy";
}

/// A named setting whose value may depend on the member index.
pub type SettingFn = Arc<dyn Fn(u32) -> String + Send + Sync>;

/// Named settings injected into one member class at cluster
/// construction. Values are functions of the member index so that
/// per-instance values (such as the advertised backup address) and
/// class-wide constants share one plumbing path.
#[derive(Clone, Default)]
pub struct InstanceSettings {
    entries: HashMap<String, SettingFn>,
}

impl InstanceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same value for every member of the class.
    pub fn set_shared(&mut self, key: &str, value: &str) -> &mut Self {
        let value = value.to_string();
        self.entries
            .insert(key.to_string(), Arc::new(move |_| value.clone()));
        self
    }

    /// Value derived from the member index.
    pub fn set_per_instance<F>(&mut self, key: &str, f: F) -> &mut Self
    where
        F: Fn(u32) -> String + Send + Sync + 'static,
    {
        self.entries.insert(key.to_string(), Arc::new(f));
        self
    }

    /// Concrete settings for the member at `index`, in stable key order.
    pub fn resolve(&self, index: u32) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, f)| (k.clone(), f(index)))
            .collect()
    }
}

impl std::fmt::Debug for InstanceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("InstanceSettings").field("keys", &keys).finish()
    }
}
