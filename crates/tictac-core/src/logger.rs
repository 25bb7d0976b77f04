//! Stderr logger for the pipeline binaries.
//!
//! Lines look like `[  12.345s  INFO tictac::pipeline] message`, with the
//! time measured from installation. Records from this workspace
//! (`tictac*` targets) pass at the configured level; everything else
//! (HTTP client, decoders) is held to `Warn` unless the level is `Trace`.
//!
//! With the `tracing` feature, [`init_tracing`] installs a
//! `tracing-subscriber` honoring `RUST_LOG` instead.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

const OWN_PREFIX: &str = "tictac";

struct StderrLogger {
    own: LevelFilter,
    foreign: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn new(level: LevelFilter) -> Self {
        let foreign = if level == LevelFilter::Trace {
            LevelFilter::Trace
        } else {
            level.min(LevelFilter::Warn)
        };
        Self {
            own: level,
            foreign,
            started: Instant::now(),
        }
    }

    fn limit_for(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_PREFIX) {
            self.own
        } else {
            self.foreign
        }
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => " WARN",
            Level::Info => " INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let mut out = std::io::stderr().lock();
        let _ = writeln!(out, "[{secs:8.3}s {tag} {}] {}", record.target(), record.args());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger::new(level));
    log::set_logger(logger)?;
    log::set_max_level(logger.own.max(logger.foreign));
    Ok(())
}

/// Install a `tracing` subscriber honoring `RUST_LOG` (default `info`).
///
/// `json` switches to flattened JSON events, one per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
