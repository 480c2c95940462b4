use clap::ValueEnum;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const FILTER_ENV: &str = "SKIFF_LOG_FILTER";
const TRACE_DEPS_ENV: &str = "SKIFF_TRACE_DEPS";

fn env_truthy(var: &str) -> Option<bool> {
    std::env::var(var).map(|v| v != "0" && !v.is_empty()).ok()
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to open log file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to configure logger: {0}")]
    Configure(String),
}

static INIT: OnceLock<()> = OnceLock::new();
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init(config: &LogConfig) -> Result<(), InitError> {
    if INIT.get().is_some() {
        return Ok(());
    }

    inner_init(config)?;
    INIT.set(()).ok();
    Ok(())
}

fn inner_init(config: &LogConfig) -> Result<(), InitError> {
    let (env_filter, throttled_deps) = build_env_filter(config.level.to_filter());

    let (writer, guard) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| InitError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_level(true)
        .with_target(config.level >= LogLevel::Debug)
        .with_thread_ids(config.level >= LogLevel::Trace)
        .with_ansi(config.file.is_none())
        .with_writer(writer)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| InitError::Configure(err.to_string()))?;

    let _ = GUARD.set(guard);
    if throttled_deps {
        eprintln!(
            "[skiff-log] suppressing dependency trace noise; set {TRACE_DEPS_ENV}=1 or {FILTER_ENV} to override"
        );
    }
    Ok(())
}

fn build_env_filter(level: LevelFilter) -> (EnvFilter, bool) {
    if let Ok(filter) = std::env::var(FILTER_ENV) {
        return (EnvFilter::new(filter), false);
    }
    let allow_deps = env_truthy(TRACE_DEPS_ENV).unwrap_or(false);
    let (filter, throttled) = default_filter_for(level, allow_deps);
    (EnvFilter::new(filter), throttled)
}

const TRACE_DEP_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "mio", "h2"];

fn default_filter_for(level: LevelFilter, allow_deps: bool) -> (String, bool) {
    let base = match level {
        LevelFilter::TRACE => "info,skiff=trace,skiff_client=trace",
        LevelFilter::DEBUG => "info,skiff=debug,skiff_client=debug",
        LevelFilter::INFO => "info",
        LevelFilter::WARN => "warn",
        LevelFilter::ERROR => "error",
        LevelFilter::OFF => "off",
    };
    if level == LevelFilter::TRACE && !allow_deps {
        (throttle_dependency_traces(base), true)
    } else {
        (base.to_owned(), false)
    }
}

fn throttle_dependency_traces(base: &str) -> String {
    let mut filter = base.to_owned();
    for target in TRACE_DEP_TARGETS {
        filter.push(',');
        filter.push_str(target);
        filter.push_str("=info");
    }
    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_timeout::timeout]
    fn trace_level_throttles_dependencies_by_default() {
        let (filter, throttled) = default_filter_for(LevelFilter::TRACE, false);
        assert!(throttled);
        assert!(filter.starts_with("info,skiff=trace,skiff_client=trace"));
        assert!(filter.contains(",reqwest=info"));
        assert!(filter.ends_with(",h2=info"));
    }

    #[test_timeout::timeout]
    fn dependency_traces_can_be_allowed() {
        let (filter, throttled) = default_filter_for(LevelFilter::TRACE, true);
        assert!(!throttled);
        assert!(!filter.contains("reqwest"));
    }

    #[test_timeout::timeout]
    fn quieter_levels_use_plain_filters() {
        assert_eq!(default_filter_for(LevelFilter::WARN, false), ("warn".to_string(), false));
        assert_eq!(
            default_filter_for(LevelFilter::DEBUG, false).0,
            "info,skiff=debug,skiff_client=debug"
        );
    }

    #[test_timeout::timeout]
    fn levels_are_ordered_by_verbosity() {
        assert!(LogLevel::Trace > LogLevel::Debug);
        assert!(LogLevel::Warn > LogLevel::Error);
        assert_eq!(LogLevel::default(), LogLevel::Warn);
        assert_eq!(LogLevel::Info.to_filter(), LevelFilter::INFO);
    }
}
