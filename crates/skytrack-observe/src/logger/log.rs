use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Identifier tracker processes log under in journald.
#[cfg(all(target_os = "linux", feature = "journald"))]
const SYSLOG_IDENTIFIER: &str = "skytrack";

/// Builds the subscriber for `cfg.format` and installs it globally.
pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let base = tracing_subscriber::registry().with(mk_filter(&cfg.level)?);
    match cfg.format {
        LoggerFormat::Text => {
            let layer = fmt::layer()
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer());
            init_with(base.with(layer))
        }
        // One object per line, span fields flattened into the event.
        LoggerFormat::Json => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer());
            init_with(base.with(layer))
        }
        LoggerFormat::Journald => install_journald(base),
    }
}

/// An empty directive string means `info`.
fn mk_filter(level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse(level.trim())
        .map_err(|e| LoggerError::InvalidLevel {
            directive: level.to_string(),
            reason: e.to_string(),
        })
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let s = e.to_string();
        if s.contains("already") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::Install(s)
        }
    })
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn install_journald<S>(base: S) -> Result<(), LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let journald = tracing_journald::layer()
        .map_err(|e| LoggerError::JournaldUnavailable(e.to_string()))?
        .with_syslog_identifier(SYSLOG_IDENTIFIER.to_string());
    init_with(base.with(journald))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn install_journald<S>(_base: S) -> Result<(), LoggerError>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    Err(LoggerError::JournaldUnavailable(
        "built without the journald feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_names_the_directive() {
        let err = mk_filter("skytrack=loud").unwrap_err();
        match err {
            LoggerError::InvalidLevel { directive, .. } => assert_eq!(directive, "skytrack=loud"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directive_list_and_empty_level_are_accepted() {
        assert!(mk_filter("warn,skytrack_core=debug").is_ok());
        assert!(mk_filter("").is_ok());
    }

    #[test]
    fn second_init_is_rejected() {
        let cfg = LoggerConfig::default();
        // Other tests in this binary may have won the race; either way the
        // second call must fail with AlreadyInitialized.
        let _ = install(&cfg);
        let json = LoggerConfig {
            format: LoggerFormat::Json,
            ..LoggerConfig::default()
        };
        assert!(matches!(install(&json), Err(LoggerError::AlreadyInitialized)));
    }
}
