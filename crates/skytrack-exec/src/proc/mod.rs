use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, trace};

use skytrack_model::JobId;

use crate::{
    LaunchError, LaunchPort, LaunchRequest, LaunchResult,
    utils::{RlimitConfig, attach_rlimits},
};

/// Lines of launcher stderr kept as the failure trace.
const TRACE_LINES: usize = 64;

/// Launcher process configuration.
///
/// `args` may reference `{cluster}`, `{task}` and `{launch_type}`; they are expanded per request.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub limits: RlimitConfig,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            limits: RlimitConfig::default(),
        }
    }
}

/// Runs every launch in a fresh child process.
///
/// The request is written to the child's stdin as JSON. The child prints the job id
/// (a bare integer, or `{"job_id": N}`) as its last stdout line; stderr becomes the
/// failure trace. The child is killed if the launch future is dropped.
#[derive(Debug)]
pub struct ProcessLauncher {
    name: &'static str,
    cfg: ProcConfig,
}

impl ProcessLauncher {
    pub fn new(cfg: ProcConfig) -> Result<Self, LaunchError> {
        if cfg.program.trim().is_empty() {
            return Err(LaunchError::Spawn("program is empty".into()));
        }
        Ok(Self { name: "proc", cfg })
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn command(&self, request: &LaunchRequest) -> Command {
        let mut cmd = Command::new(&self.cfg.program);
        cmd.args(self.cfg.args.iter().map(|a| expand(a, request)));
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        cmd.env("SKYTRACK_CLUSTER", &request.identity.cluster_name)
            .env("SKYTRACK_TASK", &request.identity.task_name)
            .env("SKYTRACK_LAUNCH_TYPE", request.identity.job_launch_type.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        attach_rlimits(&mut cmd, &self.cfg.limits);
        cmd
    }
}

#[async_trait]
impl LaunchPort for ProcessLauncher {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn launch(&self, request: &LaunchRequest) -> LaunchResult {
        trace!(target: "skytrack::launch", program = %self.cfg.program, job = %request.identity, "spawn");

        let payload = serde_json::to_vec(request)
            .map_err(|e| LaunchError::Spawn(format!("encode request: {e}")))?;
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|e| LaunchError::Spawn(format!("{}: {e}", self.cfg.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A launcher that ignores its input may exit before reading it.
            if let Err(e) = stdin.write_all(&payload).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(e.into());
            }
            drop(stdin);
        }

        let output = child.wait_with_output().await?;
        let stderr = tail(&String::from_utf8_lossy(&output.stderr), TRACE_LINES);

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => LaunchError::NonZeroExit { code, stderr },
                None => LaunchError::KilledBySignal { stderr },
            });
        }

        let job_id = parse_job_id(&String::from_utf8_lossy(&output.stdout))?;
        debug!(target: "skytrack::launch", job = %request.identity, job_id, "launcher exited successfully");
        Ok(job_id)
    }
}

fn expand(arg: &str, request: &LaunchRequest) -> String {
    arg.replace("{cluster}", &request.identity.cluster_name)
        .replace("{task}", &request.identity.task_name)
        .replace("{launch_type}", request.identity.job_launch_type.as_str())
}

fn parse_job_id(stdout: &str) -> Result<JobId, LaunchError> {
    #[derive(Deserialize)]
    struct Reply {
        #[serde(alias = "jobId")]
        job_id: JobId,
    }

    let Some(line) = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
        return Err(LaunchError::InvalidOutput("empty stdout".into()));
    };
    if let Ok(id) = line.parse::<JobId>() {
        return Ok(id);
    }
    serde_json::from_str::<Reply>(line)
        .map(|r| r.job_id)
        .map_err(|_| LaunchError::InvalidOutput(line.to_string()))
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use skytrack_model::{JobIdentity, JobLaunchType, JobSpec};

    fn request() -> LaunchRequest {
        LaunchRequest {
            identity: JobIdentity::new("c1", "train", JobLaunchType::Interactive),
            spec: JobSpec {
                task_name: "train".into(),
                cluster_name: "c1".into(),
                job_launch_type: JobLaunchType::Interactive,
                task_metadata_prefix: "p".into(),
                resources: serde_json::json!({"cpus": 2}),
                stop_after_minutes: Some(10),
                auto_down: false,
            },
        }
    }

    fn sh(script: &str) -> ProcessLauncher {
        ProcessLauncher::new(ProcConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_plain_and_json_ids() {
        assert_eq!(parse_job_id("launching...\n17\n\n").unwrap(), 17);
        assert_eq!(parse_job_id(r#"{"job_id": -1}"#).unwrap(), -1);
        assert_eq!(parse_job_id(r#"{"jobId": 5}"#).unwrap(), 5);
        assert!(matches!(parse_job_id("done"), Err(LaunchError::InvalidOutput(_))));
        assert!(matches!(parse_job_id("  "), Err(LaunchError::InvalidOutput(_))));
    }

    #[test]
    fn expands_placeholders() {
        let arg = expand("--cluster={cluster}:{task}:{launch_type}", &request());
        assert_eq!(arg, "--cluster=c1:train:interactive");
    }

    #[test]
    fn empty_program_is_rejected() {
        assert!(ProcessLauncher::new(ProcConfig::default()).is_err());
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reads_job_id_and_environment() {
        let launcher = sh(r#"cat >/dev/null; echo "launching $SKYTRACK_TASK"; echo 9"#);
        assert_eq!(launcher.launch(&request()).await.unwrap(), 9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn forwards_request_on_stdin() {
        let launcher = sh(r#"grep -q '"cpus":2' && echo 1"#);
        assert_eq!(launcher.launch(&request()).await.unwrap(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_carries_stderr_trace() {
        let launcher = sh("cat >/dev/null; echo 'quota exceeded' >&2; exit 3");
        let err = launcher.launch(&request()).await.unwrap_err();
        assert_eq!(
            err,
            LaunchError::NonZeroExit {
                code: 3,
                stderr: "quota exceeded".into()
            }
        );
    }
}
