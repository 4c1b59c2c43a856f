use std::{path::PathBuf, sync::Arc};

use tracing::{debug, warn};

use skytrack_core::{
    Ports, PortError, TrackerError,
    events::{EventKind, log_event},
    restore_state,
};
use skytrack_model::RemoteJobMetadata;
use skytrack_store::{ObjectStore, RemotePathRegistry, TrackerPaths};

/// Tears down the cluster of a job whose tracker is gone.
///
/// The dead tracker's state bundle is restored into a scratch directory and handed to
/// `down`; its registration marker is removed afterwards. Failures are logged only.
pub(crate) async fn out_of_band_down(
    store: &Arc<dyn ObjectStore>,
    ports: &Ports,
    meta: &RemoteJobMetadata,
) {
    let tracker = RemotePathRegistry::new(Arc::clone(store), TrackerPaths::from_metadata(meta));
    let scratch = scratch_dir(meta);

    let state_dir = match restore_state(&tracker, &scratch).await {
        Ok(0) => None,
        Ok(files) => {
            debug!(
                target: "skytrack::agent",
                tracker = %meta.tracker_hostname,
                files,
                "restored tracker state"
            );
            Some(scratch.as_path())
        }
        Err(e) => {
            warn!(
                target: "skytrack::agent",
                tracker = %meta.tracker_hostname,
                error = %e,
                "failed to restore tracker state; tearing down without it"
            );
            None
        }
    };

    let cluster = meta.cluster_name.as_str();
    match ports.deprovision.down(cluster, state_dir).await {
        Ok(()) => log_event(EventKind::OutOfBandDown, &cluster, None),
        Err(PortError::Unsupported(reason)) => {
            let err = TrackerError::DeprovisionUnsupported {
                cluster: cluster.to_string(),
                reason,
            };
            warn!(target: "skytrack::agent", error = %err, "out-of-band teardown skipped");
        }
        Err(e) => log_event(EventKind::StopFailed, &cluster, Some(&e.to_string())),
    }

    if let Err(e) = tracker.delete_task(&meta.identity().unique_id()).await {
        warn!(target: "skytrack::agent", error = %e, "failed to delete registration marker");
    }
    if let Err(e) = tokio::fs::remove_dir_all(&scratch).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        debug!(target: "skytrack::agent", path = %scratch.display(), error = %e, "scratch dir left behind");
    }
}

fn scratch_dir(meta: &RemoteJobMetadata) -> PathBuf {
    std::env::temp_dir().join(format!(
        "skytrack-restore-{}-{}",
        meta.identity().unique_id(),
        uuid::Uuid::new_v4()
    ))
}
