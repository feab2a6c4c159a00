//! Phase timings for print jobs.
//!
//! Tiling a 1200 DPI sheet, encoding it and downscaling the checkout preview are the slow
//! phases of a job. Each one holds a [`TimingGuard`] for its duration; dropping the guard
//! writes `"<phase> completed in <elapsed>"` to the `locket::telemetry` log target. Nothing is
//! written unless [`configure`] switched timings on and the phase level is within both the
//! configured threshold and the logger's own filter.

use std::{
    borrow::Cow,
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
    time::{Duration, Instant},
};

use log::{Level, LevelFilter, log, log_enabled};

/// Log target every phase timing is written to.
pub const TELEMETRY_TARGET: &str = "locket::telemetry";

static TELEMETRY_ENABLED: AtomicBool = AtomicBool::new(false);
static TELEMETRY_THRESHOLD: AtomicU8 = AtomicU8::new(0);

fn threshold() -> LevelFilter {
    match TELEMETRY_THRESHOLD.load(Ordering::Relaxed) {
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        5 => LevelFilter::Trace,
        _ => LevelFilter::Off,
    }
}

/// Times one phase of a print job and reports it when dropped.
pub struct TimingGuard {
    phase: Cow<'static, str>,
    level: Level,
    start: Instant,
    active: bool,
}

impl TimingGuard {
    /// Whether dropping this guard will report the phase.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// End the phase silently and hand back its duration.
    pub fn finish(mut self) -> Duration {
        self.active = false;
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        log!(
            target: TELEMETRY_TARGET,
            self.level,
            "{} completed in {:.2?}",
            self.phase,
            self.start.elapsed()
        );
    }
}

/// Start timing `phase`, reported at `level`.
pub fn timing_guard(phase: impl Into<Cow<'static, str>>, level: Level) -> TimingGuard {
    timing_guard_if(phase, level, true)
}

/// Start timing `phase` only when the caller's own switch is also on.
pub fn timing_guard_if(
    phase: impl Into<Cow<'static, str>>,
    level: Level,
    enabled: bool,
) -> TimingGuard {
    TimingGuard {
        phase: phase.into(),
        level,
        start: Instant::now(),
        active: enabled
            && telemetry_allows(level)
            && log_enabled!(target: TELEMETRY_TARGET, level),
    }
}

/// Apply the `telemetry` section of the settings.
pub fn configure(enabled: bool, level: LevelFilter) {
    TELEMETRY_ENABLED.store(enabled, Ordering::Relaxed);
    TELEMETRY_THRESHOLD.store(level as u8, Ordering::Relaxed);
}

pub fn telemetry_enabled() -> bool {
    TELEMETRY_ENABLED.load(Ordering::Relaxed)
}

/// `true` when timings are on and `level` is no more verbose than the configured threshold.
pub fn telemetry_allows(level: Level) -> bool {
    telemetry_enabled() && level <= threshold()
}
