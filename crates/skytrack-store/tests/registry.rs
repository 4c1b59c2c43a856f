use std::sync::Arc;

use skytrack_model::{JobIdentity, JobLaunchType, RemoteJobMetadata, StatusRecord, TaskStatus};
use skytrack_store::{JobFiles, MemoryStore, ObjectStore, RemotePathRegistry, TrackerPaths};

fn registry(store: &MemoryStore) -> RemotePathRegistry {
    RemotePathRegistry::new(
        Arc::new(store.clone()) as Arc<dyn ObjectStore>,
        TrackerPaths::new("raw", "agent-0"),
    )
}

#[tokio::test]
async fn touch_is_idempotent() {
    let store = MemoryStore::new();
    let reg = registry(&store);

    assert!(!reg.task_exists("job-1").await.unwrap());
    reg.touch_task("job-1").await.unwrap();
    reg.touch_task("job-1").await.unwrap();

    assert!(reg.task_exists("job-1").await.unwrap());
    assert_eq!(store.write_count("raw/registry/job-1.created"), 1);
}

#[tokio::test]
async fn delete_twice_is_a_noop() {
    let store = MemoryStore::new();
    let reg = registry(&store);

    reg.touch_task("job-1").await.unwrap();
    reg.delete_task("job-1").await.unwrap();
    reg.delete_task("job-1").await.unwrap();

    assert!(!reg.task_exists("job-1").await.unwrap());
    assert!(store.is_empty());
}

#[tokio::test]
async fn markers_are_visible_to_other_trackers() {
    let store = MemoryStore::new();
    registry(&store).touch_task("job-1").await.unwrap();

    let other = RemotePathRegistry::new(Arc::new(store.clone()), TrackerPaths::new("raw", "agent-1"));
    assert!(other.task_exists("job-1").await.unwrap());
}

#[tokio::test]
async fn heartbeat_and_state_bundle() {
    let store = MemoryStore::new();
    let reg = registry(&store);

    assert!(reg.last_heartbeat().await.unwrap().is_none());

    reg.put_state_file("state.db", b"db".to_vec()).await.unwrap();
    reg.put_state_file("keys/id_rsa", b"key".to_vec()).await.unwrap();
    reg.put_heartbeat(2).await.unwrap();

    assert!(reg.last_heartbeat().await.unwrap().is_some());
    let files = reg.state_files().await.unwrap();
    assert_eq!(
        files,
        vec![
            ("keys/id_rsa".to_string(), b"key".to_vec()),
            ("state.db".to_string(), b"db".to_vec()),
        ]
    );
}

#[tokio::test]
async fn job_files_from_metadata_see_the_same_objects() {
    let store = MemoryStore::new();
    let identity = JobIdentity::new("c1", "train", JobLaunchType::Interactive);
    let writer = JobFiles::new(Arc::new(store.clone()), "raw", &identity);

    let record = StatusRecord {
        tracker_status: TaskStatus::Running,
        provisioner_status: Some("RUNNING".into()),
        job_id: Some(3),
        reason: None,
        updated_at: std::time::UNIX_EPOCH,
    };
    writer.put_status(&record).await.unwrap();
    writer.put_error_log("boom").await.unwrap();

    let meta = RemoteJobMetadata {
        job_name: "train".into(),
        cluster_name: "c1".into(),
        task_metadata_prefix: "raw".into(),
        tracker_hostname: "agent-0".into(),
        job_launch_type: JobLaunchType::Interactive,
    };
    let reader = JobFiles::from_metadata(Arc::new(store.clone()), &meta);
    assert_eq!(reader.get_status().await.unwrap(), Some(record));
    assert_eq!(reader.get_error_log().await.unwrap().as_deref(), Some("boom"));

    assert!(!reader.deletion_requested().await.unwrap());
    reader.request_deletion(&meta).await.unwrap();
    assert!(writer.deletion_requested().await.unwrap());
}
