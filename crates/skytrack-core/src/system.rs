use std::{fs, path::Path, sync::OnceLock};

static TRACKER_ID: OnceLock<String> = OnceLock::new();

/// Identity of this tracker process, stable for its lifetime.
///
/// Resolution order: `SKYTRACK_TRACKER_ID`, container id, hostname, random uuid.
/// Inside Kubernetes the hostname is the pod name, which is what other agents see.
pub fn tracker_id() -> &'static str {
    TRACKER_ID.get_or_init(|| {
        if let Ok(id) = std::env::var("SKYTRACK_TRACKER_ID")
            && !id.trim().is_empty()
        {
            return id.trim().to_string();
        }
        if !is_kubernetes()
            && let Some(container_id) = container_id()
        {
            return container_id;
        }
        if let Ok(hostname) = hostname::get()
            && let Some(name) = hostname.to_str()
            && !name.is_empty()
        {
            return name.to_string();
        }
        uuid::Uuid::new_v4().to_string()
    })
}

fn is_kubernetes() -> bool {
    std::env::var("KUBERNETES_SERVICE_HOST").is_ok()
        || Path::new("/var/run/secrets/kubernetes.io/serviceaccount").exists()
}

fn container_id() -> Option<String> {
    if !Path::new("/.dockerenv").exists() {
        return None;
    }
    parse_container_id(&fs::read_to_string("/proc/self/cgroup").ok()?)
}

fn parse_container_id(cgroup: &str) -> Option<String> {
    for line in cgroup.lines() {
        if let Some(part) = line.split('/').find(|s| s.starts_with("docker-")) {
            let id = part.trim_start_matches("docker-").trim_end_matches(".scope");
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        if let Some(id) = line
            .split("/docker/")
            .nth(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Some(id.to_string());
        }
    }
    None
}
