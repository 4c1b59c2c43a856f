use std::io::IsTerminal;

use serde::Deserialize;

use crate::logger::format::LoggerFormat;

/// Logger settings of a tracker process.
///
/// Deserializable so it can sit in the agent's TOML file:
/// ```toml
/// [logger]
/// format = "json"
/// level = "info,skytrack_core=debug"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// `EnvFilter` directive string.
    pub level: String,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: "info".to_string(),
            with_targets: true,
            use_color,
        }
    }
}
