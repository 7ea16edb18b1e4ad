use tempfile::tempdir;

use super::setting_keys;
use super::*;
use crate::ClusterError;

fn backup_settings(base_port: u16) -> InstanceSettings {
    let mut settings = InstanceSettings::new();
    settings.set_shared(setting_keys::BACKUP_ENABLED, "true");
    settings.set_per_instance(setting_keys::BACKUP_ADDRESS, move |index| {
        format!("127.0.0.1:{}", base_port + index as u16)
    });
    settings
}

fn aggressive_core_settings(base_port: u16) -> InstanceSettings {
    let mut settings = backup_settings(base_port);
    settings.set_shared(setting_keys::LOG_ROTATION_SIZE, "1K");
    settings.set_shared(setting_keys::LOG_PRUNING_INTERVAL, "1s");
    settings.set_shared(setting_keys::LOG_PRUNING_STRATEGY, "keep_none");
    settings
}

fn cluster_in(dir: &std::path::Path) -> LocalCluster {
    LocalCluster::new(
        dir,
        3,
        1,
        &aggressive_core_settings(8000),
        &backup_settings(9000),
    )
    .unwrap()
}

#[tokio::test]
async fn start_brings_every_member_live() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());

    cluster.start().await.unwrap();

    let members = cluster.members();
    assert_eq!(members.len(), 4);
    for m in &members {
        assert!(cluster.is_member_live(m.id).await, "{} should be live", m.id);
    }
}

#[tokio::test]
async fn put_then_get_roundtrips() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    cluster.put(b"k1".to_vec(), b"v1".to_vec()).await.unwrap();
    assert_eq!(cluster.get(b"k1".to_vec()).await.unwrap(), Some(b"v1".to_vec()));
    assert_eq!(cluster.get(b"missing".to_vec()).await.unwrap(), None);
}

#[tokio::test]
async fn operations_before_start_and_after_shutdown_are_refused() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());

    assert!(matches!(
        cluster.put(b"k".to_vec(), b"v".to_vec()).await,
        Err(ClusterError::NotRunning)
    ));

    cluster.start().await.unwrap();
    cluster.shutdown().await.unwrap();

    assert!(matches!(
        cluster.get(b"k".to_vec()).await,
        Err(ClusterError::NotRunning)
    ));
}

#[tokio::test]
async fn starting_twice_is_a_lifecycle_violation() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    assert!(matches!(cluster.start().await, Err(ClusterError::Lifecycle(_))));
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    cluster.shutdown().await.unwrap();
    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn stopped_member_recovers_durable_state_on_restart() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    cluster.put(b"persistent".to_vec(), b"entry".to_vec()).await.unwrap();

    let target = MemberId::new(MemberClass::Core, 0);
    cluster.stop_member(target).await.unwrap();
    assert!(!cluster.is_member_live(target).await);

    cluster.start_member(target).await.unwrap();
    assert!(cluster.is_member_live(target).await);

    // Silence every other member so the read can only be served by the
    // restarted one.
    cluster.stop_member(MemberId::new(MemberClass::Core, 1)).await.unwrap();
    cluster.stop_member(MemberId::new(MemberClass::Core, 2)).await.unwrap();
    cluster.stop_member(MemberId::new(MemberClass::Edge, 0)).await.unwrap();

    assert_eq!(
        cluster.get(b"persistent".to_vec()).await.unwrap(),
        Some(b"entry".to_vec())
    );
}

#[tokio::test]
async fn restarted_member_catches_up_on_entries_committed_while_down() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    let target = MemberId::new(MemberClass::Core, 0);
    cluster.stop_member(target).await.unwrap();

    // Still 2/3 cores live, so this commits.
    cluster.put(b"while-down".to_vec(), b"committed".to_vec()).await.unwrap();

    cluster.start_member(target).await.unwrap();

    cluster.stop_member(MemberId::new(MemberClass::Core, 1)).await.unwrap();
    cluster.stop_member(MemberId::new(MemberClass::Core, 2)).await.unwrap();
    cluster.stop_member(MemberId::new(MemberClass::Edge, 0)).await.unwrap();

    assert_eq!(
        cluster.get(b"while-down".to_vec()).await.unwrap(),
        Some(b"committed".to_vec())
    );
}

#[tokio::test]
async fn losing_core_majority_refuses_writes() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    cluster.stop_member(MemberId::new(MemberClass::Core, 0)).await.unwrap();
    cluster.stop_member(MemberId::new(MemberClass::Core, 1)).await.unwrap();

    assert!(matches!(
        cluster.put(b"k".to_vec(), b"v".to_vec()).await,
        Err(ClusterError::NoQuorum { live: 1, required: 2 })
    ));
}

#[tokio::test]
async fn edge_members_serve_replicated_entries() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    cluster.put(b"replicated".to_vec(), b"to-edge".to_vec()).await.unwrap();

    for index in 0..3 {
        cluster.stop_member(MemberId::new(MemberClass::Core, index)).await.unwrap();
    }

    assert_eq!(
        cluster.get(b"replicated".to_vec()).await.unwrap(),
        Some(b"to-edge".to_vec())
    );
}

#[tokio::test]
async fn reads_with_no_live_member_surface_as_availability_error() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    for m in cluster.members() {
        cluster.stop_member(m.id).await.unwrap();
    }

    let err = cluster.get(b"k".to_vec()).await.unwrap_err();
    assert!(err.is_availability());
}

#[tokio::test]
async fn churning_an_unknown_member_is_rejected() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());
    cluster.start().await.unwrap();

    let ghost = MemberId::new(MemberClass::Core, 42);
    assert!(matches!(
        cluster.stop_member(ghost).await,
        Err(ClusterError::UnknownMember(_))
    ));
    assert!(!cluster.is_member_live(ghost).await);
}

#[tokio::test]
async fn members_resolve_by_backup_address() {
    let dir = tempdir().unwrap();
    let cluster = cluster_in(dir.path());

    let core1 = "127.0.0.1:8001".parse().unwrap();
    let found = cluster.member_by_backup_address(core1).unwrap();
    assert_eq!(found.id(), MemberId::new(MemberClass::Core, 1));

    let edge0 = "127.0.0.1:9000".parse().unwrap();
    let found = cluster.member_by_backup_address(edge0).unwrap();
    assert_eq!(found.id(), MemberId::new(MemberClass::Edge, 0));

    let unknown = "127.0.0.1:12345".parse().unwrap();
    assert!(cluster.member_by_backup_address(unknown).is_none());
}

#[test]
fn bootstrap_requires_a_backup_address() {
    let dir = tempdir().unwrap();
    let mut settings = InstanceSettings::new();
    settings.set_shared(setting_keys::BACKUP_ENABLED, "true");

    let result = LocalCluster::new(dir.path(), 1, 0, &settings, &InstanceSettings::new());
    assert!(matches!(result, Err(ClusterError::Settings(_))));
}

#[test]
fn bootstrap_rejects_malformed_backup_addresses() {
    let dir = tempdir().unwrap();
    let mut settings = InstanceSettings::new();
    settings.set_shared(setting_keys::BACKUP_ADDRESS, "not-an-address");

    let result = LocalCluster::new(dir.path(), 1, 0, &settings, &InstanceSettings::new());
    assert!(matches!(result, Err(ClusterError::Settings(_))));
}
