use std::collections::BTreeMap;
use std::fs;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use dashmap::DashMap;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tracing::debug;

use super::setting_keys;
use super::MemberId;
use super::MemberInfo;
use crate::ClusterError;

const DURABLE_LOG: &str = "store.wal";
const SETTINGS_FILE: &str = "member.conf";

/// One in-process cluster member.
///
/// Serving state lives in memory and is dropped on stop (a stop models a
/// process death); every accepted entry is also appended to a durable
/// log under the member's data directory, which a restart replays before
/// the member rejoins.
pub(crate) struct LocalMember {
    info: MemberInfo,
    data_dir: PathBuf,
    settings: BTreeMap<String, String>,
    backup_enabled: bool,
    running: RwLock<bool>,
    wal_lock: Mutex<()>,
    store: DashMap<Vec<u8>, Vec<u8>>,
}

impl LocalMember {
    /// Creates the member's data directory, persists its resolved
    /// settings, and leaves the member stopped.
    pub(crate) fn bootstrap(
        id: MemberId,
        cluster_dir: &Path,
        settings: BTreeMap<String, String>,
    ) -> std::result::Result<Self, ClusterError> {
        let backup_address = settings
            .get(setting_keys::BACKUP_ADDRESS)
            .ok_or_else(|| {
                ClusterError::Settings(format!("member {id} has no {}", setting_keys::BACKUP_ADDRESS))
            })?
            .parse()
            .map_err(|e| {
                ClusterError::Settings(format!("member {id} has a malformed backup address: {e}"))
            })?;

        let backup_enabled = match settings.get(setting_keys::BACKUP_ENABLED) {
            None => true,
            Some(raw) => raw.parse().map_err(|_| {
                ClusterError::Settings(format!(
                    "member {id}: {}={raw} is not a boolean",
                    setting_keys::BACKUP_ENABLED
                ))
            })?,
        };

        let data_dir = cluster_dir.join(id.to_string());
        fs::create_dir_all(&data_dir)?;

        let mut conf = BufWriter::new(fs::File::create(data_dir.join(SETTINGS_FILE))?);
        for (key, value) in &settings {
            writeln!(conf, "{key}={value}")?;
        }
        conf.flush()?;

        Ok(Self {
            info: MemberInfo { id, backup_address },
            data_dir,
            settings,
            backup_enabled,
            running: RwLock::new(false),
            wal_lock: Mutex::new(()),
            store: DashMap::new(),
        })
    }

    pub(crate) fn info(&self) -> &MemberInfo {
        &self.info
    }

    pub(crate) fn id(&self) -> MemberId {
        self.info.id
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub(crate) fn backup_enabled(&self) -> bool {
        self.backup_enabled
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.running.read()
    }

    /// Recover durable state, catch up on entries committed while this
    /// member was down, then start serving.
    pub(crate) fn start(
        &self,
        committed: &DashMap<Vec<u8>, Vec<u8>>,
    ) -> std::result::Result<(), ClusterError> {
        let mut running = self.running.write();
        if *running {
            return Err(ClusterError::AlreadyRunning(self.id()));
        }

        self.replay_durable_log()?;

        for entry in committed.iter() {
            if self.store.get(entry.key()).map(|v| v.value().clone()) != Some(entry.value().clone()) {
                self.append_durable(entry.key(), entry.value())?;
                self.store.insert(entry.key().clone(), entry.value().clone());
            }
        }

        if self.settings.get(setting_keys::LOG_PRUNING_STRATEGY).map(String::as_str)
            == Some("keep_none")
        {
            self.compact_durable_log()?;
        }

        *running = true;
        debug!(member = %self.id(), entries = self.store.len(), "member serving");
        Ok(())
    }

    /// Drop serving state, keeping only what the durable log holds.
    pub(crate) fn stop(&self) -> std::result::Result<(), ClusterError> {
        let mut running = self.running.write();
        if !*running {
            return Err(ClusterError::MemberStopped(self.id()));
        }
        self.store.clear();
        *running = false;
        debug!(member = %self.id(), "member stopped");
        Ok(())
    }

    pub(crate) fn apply(
        &self,
        key: &[u8],
        value: &[u8],
    ) -> std::result::Result<(), ClusterError> {
        let running = self.running.read();
        if !*running {
            return Err(ClusterError::MemberStopped(self.id()));
        }
        self.append_durable(key, value)?;
        self.store.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    pub(crate) fn read(
        &self,
        key: &[u8],
    ) -> std::result::Result<Option<Vec<u8>>, ClusterError> {
        let running = self.running.read();
        if !*running {
            return Err(ClusterError::MemberStopped(self.id()));
        }
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    fn wal_path(&self) -> PathBuf {
        self.data_dir.join(DURABLE_LOG)
    }

    fn append_durable(&self, key: &[u8], value: &[u8]) -> std::result::Result<(), ClusterError> {
        let _guard = self.wal_lock.lock();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.wal_path())?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &(key.to_vec(), value.to_vec())).map_err(|e| {
            ClusterError::CorruptLog {
                member: self.id(),
                detail: format!("failed to append record: {e}"),
            }
        })?;
        writer.flush()?;
        Ok(())
    }

    fn replay_durable_log(&self) -> std::result::Result<(), ClusterError> {
        let path = self.wal_path();
        if !path.exists() {
            return Ok(());
        }

        let mut reader = BufReader::new(fs::File::open(&path)?);
        loop {
            match bincode::deserialize_from::<_, (Vec<u8>, Vec<u8>)>(&mut reader) {
                Ok((key, value)) => {
                    self.store.insert(key, value);
                }
                Err(e) => match *e {
                    bincode::ErrorKind::Io(ref io)
                        if io.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    _ => {
                        return Err(ClusterError::CorruptLog {
                            member: self.id(),
                            detail: e.to_string(),
                        })
                    }
                },
            }
        }
        Ok(())
    }

    /// Rewrite the durable log to one record per live key. Honors the
    /// `log_pruning_strategy = "keep_none"` setting on restart.
    fn compact_durable_log(&self) -> std::result::Result<(), ClusterError> {
        let _guard = self.wal_lock.lock();
        let tmp = self.data_dir.join(format!("{DURABLE_LOG}.compacting"));
        {
            let mut writer = BufWriter::new(fs::File::create(&tmp)?);
            for entry in self.store.iter() {
                bincode::serialize_into(&mut writer, &(entry.key().clone(), entry.value().clone()))
                    .map_err(|e| ClusterError::CorruptLog {
                        member: self.id(),
                        detail: format!("failed to compact record: {e}"),
                    })?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, self.wal_path())?;
        Ok(())
    }
}
