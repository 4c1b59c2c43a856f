//! POSIX rlimits for the isolated launcher process.
//!
//! On Unix the limits are applied in a `pre_exec` hook, between `fork()` and `execve()`,
//! so the launcher never runs unrestricted. Elsewhere the request is logged and ignored.
use serde::Deserialize;
use tokio::process::Command;
#[cfg(not(unix))]
use tracing::warn;

/// Resource limits of a launcher process. `None` keeps the inherited limit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RlimitConfig {
    /// `RLIMIT_NOFILE`.
    pub max_open_files: Option<u64>,
    /// `RLIMIT_FSIZE`; the kernel sends `SIGXFSZ` past it.
    pub max_file_size_bytes: Option<u64>,
    /// `RLIMIT_AS`, caps the address space of provisioner clients that leak.
    pub max_address_space_bytes: Option<u64>,
    /// Set `RLIMIT_CORE = 0`.
    pub disable_core_dumps: bool,
}

impl RlimitConfig {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_open_files.is_none()
            && self.max_file_size_bytes.is_none()
            && self.max_address_space_bytes.is_none()
            && !self.disable_core_dumps
    }
}

pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, config.clone());
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "skytrack::launch",
            ?config,
            "rlimits requested on a non-Unix OS; ignored"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    // The resource constant type differs between libc flavours, so the call is a macro.
    macro_rules! set_limit {
        ($resource:expr, $value:expr) => {{
            let rlim = libc::rlimit {
                rlim_cur: $value as libc::rlim_t,
                rlim_max: $value as libc::rlim_t,
            };
            // SAFETY: `rlim` is a valid, initialized struct for the duration of the call.
            if unsafe { libc::setrlimit($resource, &rlim) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }};
    }

    pub fn attach_rlimits(cmd: &mut Command, config: RlimitConfig) {
        let hook = move || -> io::Result<()> {
            if let Some(nofile) = config.max_open_files {
                set_limit!(libc::RLIMIT_NOFILE, nofile);
            }
            if let Some(fsize) = config.max_file_size_bytes {
                set_limit!(libc::RLIMIT_FSIZE, fsize);
            }
            if let Some(bytes) = config.max_address_space_bytes {
                set_limit!(libc::RLIMIT_AS, bytes);
            }
            if config.disable_core_dumps {
                set_limit!(libc::RLIMIT_CORE, 0u64);
            }
            Ok(())
        };
        // SAFETY: the hook only calls async-signal-safe `setrlimit`.
        unsafe {
            cmd.pre_exec(hook);
        }
    }
}
