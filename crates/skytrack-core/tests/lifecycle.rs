use std::{sync::Arc, time::Duration};

use skytrack_core::{
    TaskRegistry, TrackerConfig,
    poller::normalize,
    testing::{FakeLaunch, FakePorts, RecordingDeprovision},
};
use skytrack_exec::LaunchError;
use skytrack_model::{JobLaunchType, JobSpec, NormalizedPhase, TaskStatus};
use skytrack_store::{JobFiles, MemoryStore, ObjectStore, RemotePathRegistry, TrackerPaths};

const PREFIX: &str = "raw";
const TRACKER: &str = "tracker-0";

fn config() -> TrackerConfig {
    TrackerConfig {
        poll_interval_ms: 100,
        heartbeat_interval_ms: 200,
        sync_interval_ms: 1_000,
        ..Default::default()
    }
}

fn spec(task: &str, cluster: &str) -> JobSpec {
    JobSpec {
        task_name: task.into(),
        cluster_name: cluster.into(),
        job_launch_type: JobLaunchType::Interactive,
        task_metadata_prefix: PREFIX.into(),
        resources: serde_json::Value::Null,
        stop_after_minutes: None,
        auto_down: false,
    }
}

fn registry(store: &MemoryStore, fakes: &FakePorts) -> TaskRegistry {
    TaskRegistry::new(
        config(),
        TRACKER,
        Arc::new(store.clone()) as Arc<dyn ObjectStore>,
        fakes.ports(),
    )
}

fn markers(store: &MemoryStore) -> RemotePathRegistry {
    RemotePathRegistry::new(
        Arc::new(store.clone()) as Arc<dyn ObjectStore>,
        TrackerPaths::new(PREFIX, TRACKER),
    )
}

#[tokio::test(start_paused = true)]
async fn register_twice_launches_once() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("j1", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let first = registry.register(&spec("j1", "c1")).await.unwrap();
    let second = registry.register(&spec("j1", "c1")).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
    let marker = TrackerPaths::new(PREFIX, TRACKER).task_marker(&first.identity().unique_id());
    assert_eq!(store.write_count(&marker), 1);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fakes.launch.calls(), 1);
    assert_eq!(first.status(), TaskStatus::Running);
    assert_eq!(first.job_id(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn existing_marker_is_indexed_without_launch() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    let registry = registry(&store, &fakes);

    let uid = spec("j1", "c1").identity("unused").unique_id();
    markers(&store).touch_task(&uid).await.unwrap();

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(!controller.is_started());
    assert_eq!(controller.status(), TaskStatus::Init);
    assert_eq!(fakes.launch.calls(), 0);
    assert_eq!(registry.list_by_cluster("c1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn job_runs_to_completion_and_stops_cluster() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(42));
    fakes.status.script("j1", &["PENDING", "RUNNING", "SUCCEEDED"]);
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    controller.join().await;

    assert!(controller.signals().is_finished());
    assert!(!controller.signals().is_failed());
    assert_eq!(controller.status(), TaskStatus::Done);
    assert_eq!(fakes.deprovision.stops(), vec!["c1".to_string()]);

    let record = controller.files().get_status().await.unwrap().unwrap();
    assert_eq!(record.provisioner_status.as_deref(), Some("SUCCEEDED"));
    assert_eq!(record.job_id, Some(42));

    let uid = controller.identity().unique_id();
    assert!(!markers(&store).task_exists(&uid).await.unwrap());

    // Finished jobs stay queryable until deleted.
    assert!(registry.get(controller.identity()).is_some());
}

#[tokio::test(start_paused = true)]
async fn launch_failure_publishes_error_log() {
    let store = MemoryStore::new();
    let failure = LaunchError::Provisioner {
        message: "quota exceeded".into(),
        trace: Some("at provision()".into()),
    };
    let fakes = FakePorts::new(FakeLaunch::with_outcome(Err(failure), Duration::from_millis(50)));
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    controller.join().await;

    assert!(controller.signals().is_failed());
    assert!(!controller.signals().is_launch_done());
    assert_eq!(controller.status(), TaskStatus::Done);

    let log = controller.files().get_error_log().await.unwrap().unwrap();
    assert!(log.contains("quota exceeded"));
    assert!(log.contains("at provision()"));
    assert_eq!(fakes.deprovision.stops().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn teardown_runs_once_when_failed_and_cancelled() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::with_outcome(Ok(1), Duration::from_secs(3_600)));
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.signals().set_failed();
    controller.cancel();
    controller.join().await;

    assert_eq!(controller.status(), TaskStatus::Done);
    assert_eq!(fakes.deprovision.stops(), vec!["c1".to_string()]);
    assert!(controller.job_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn deletion_marker_cancels_job() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(7));
    fakes.status.script("j1", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(controller.status(), TaskStatus::Running);

    let files = JobFiles::from_metadata(
        Arc::new(store.clone()) as Arc<dyn ObjectStore>,
        controller.metadata(),
    );
    files.request_deletion(controller.metadata()).await.unwrap();
    controller.join().await;

    assert!(controller.signals().is_cancelled());
    assert!(!controller.signals().is_failed());
    assert_eq!(fakes.deprovision.stops(), vec!["c1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn shared_cluster_stops_after_last_job() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("j1", &["RUNNING"]);
    fakes.status.script("j2", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let j1 = registry.register(&spec("j1", "c2")).await.unwrap();
    let j2 = registry.register(&spec("j2", "c2")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(registry.list_by_cluster("c2").len(), 2);

    registry.delete(j1.identity()).await.unwrap();
    assert!(fakes.deprovision.stops().is_empty());
    assert_eq!(j2.status(), TaskStatus::Running);

    registry.delete(j2.identity()).await.unwrap();
    assert_eq!(fakes.deprovision.stops(), vec!["c2".to_string()]);
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsupported_stop_is_tolerated() {
    let store = MemoryStore::new();
    let fakes = FakePorts::with_deprovision(FakeLaunch::ok(1), RecordingDeprovision::unsupported());
    fakes.status.script("j1", &["SUCCEEDED"]);
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    controller.join().await;

    assert_eq!(fakes.deprovision.stops().len(), 1);
    let uid = controller.identity().unique_id();
    assert!(!markers(&store).task_exists(&uid).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn status_outage_exhausts_heartbeat_budget() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.set_failing(true);
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    controller.join().await;

    assert!(controller.signals().is_failed());
    let log = controller.files().get_error_log().await.unwrap().unwrap();
    assert!(log.contains("status upload failed 3 times"));
}

#[tokio::test(start_paused = true)]
async fn tracker_heartbeat_is_published_after_register() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("j1", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(markers(&store).last_heartbeat().await.unwrap().is_some());

    registry.shutdown().await;
    assert_eq!(fakes.deprovision.stops(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn invalid_spec_is_rejected() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    let registry = registry(&store, &fakes);

    let err = registry.register(&spec("", "c1")).await.unwrap_err();
    assert!(err.to_string().contains("task name"));
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dashed_names_register_distinct_jobs() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("c", &["RUNNING"]);
    fakes.status.script("b-c", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let left = registry.register(&spec("c", "a-b")).await.unwrap();
    let right = registry.register(&spec("b-c", "a")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(left.is_started());
    assert!(right.is_started());
    assert_eq!(fakes.launch.calls(), 2);
    assert_eq!(right.status(), TaskStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn recreated_job_starts_from_clean_files() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(3));
    fakes.status.script("j1", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let first = registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    first.files().put_error_log("earlier failure").await.unwrap();
    first.files().request_deletion(first.metadata()).await.unwrap();
    registry.delete(first.identity()).await.unwrap();
    assert!(first.signals().is_cancelled());

    let second = registry.register(&spec("j1", "c1")).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!second.signals().is_terminal());
    assert_eq!(second.status(), TaskStatus::Running);
    assert!(!second.files().deletion_requested().await.unwrap());
    assert_eq!(second.files().get_error_log().await.unwrap(), None);
    assert_eq!(fakes.launch.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_job_publishes_closing_record() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::with_outcome(Ok(1), Duration::from_secs(3_600)));
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    controller.cancel();
    controller.join().await;

    let record = controller.files().get_status().await.unwrap().unwrap();
    assert_eq!(record.tracker_status, TaskStatus::Done);
    assert_eq!(record.provisioner_status, None);
    assert_eq!(record.reason.as_deref(), Some("cancelled by user"));

    let report = normalize(JobLaunchType::Interactive, Some(&record));
    assert_eq!(report.phase, NormalizedPhase::Aborted);
    assert_eq!(report.message.as_deref(), Some("cancelled by user"));
}

#[tokio::test(start_paused = true)]
async fn failed_job_closing_record_carries_failure() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.set_failing(true);
    let registry = registry(&store, &fakes);

    let controller = registry.register(&spec("j1", "c1")).await.unwrap();
    controller.join().await;

    let record = controller.files().get_status().await.unwrap().unwrap();
    assert_eq!(record.tracker_status, TaskStatus::Done);
    assert!(record.reason.unwrap().contains("status upload failed"));
}

#[tokio::test(start_paused = true)]
async fn deleting_last_job_releases_sync_prefix() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("j1", &["RUNNING"]);
    fakes.status.script("j2", &["RUNNING"]);
    let registry = registry(&store, &fakes);

    let mut elsewhere = spec("j2", "c2");
    elsewhere.task_metadata_prefix = "other".into();
    registry.register(&spec("j1", "c1")).await.unwrap();
    let j2 = registry.register(&elsewhere).await.unwrap();
    assert_eq!(registry.sync_prefixes(), vec!["other".to_string(), "raw".to_string()]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.delete(j2.identity()).await.unwrap();
    assert_eq!(registry.sync_prefixes(), vec!["raw".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn foreign_marker_does_not_keep_cluster_busy() {
    let store = MemoryStore::new();
    let fakes = FakePorts::new(FakeLaunch::ok(1));
    fakes.status.script("j2", &["RUNNING", "SUCCEEDED"]);
    let registry = registry(&store, &fakes);

    let uid = spec("j1", "c1").identity("unused").unique_id();
    markers(&store).touch_task(&uid).await.unwrap();
    let stub = registry.register(&spec("j1", "c1")).await.unwrap();
    assert!(!stub.is_started());

    let real = registry.register(&spec("j2", "c1")).await.unwrap();
    real.join().await;

    assert_eq!(registry.list_by_cluster("c1").len(), 2);
    assert_eq!(fakes.deprovision.stops(), vec!["c1".to_string()]);
}
