//! Hitch watchdog for latency-sensitive sections.
//!
//! A scope guard that measures how long a section took and logs a warning
//! when it exceeded its threshold. Purely observational: it never changes
//! outcomes, only reports them. Disabled by default; flipped on via worker
//! settings.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub const MICROSECONDS_PER_MILLISECOND: u64 = 1_000;

static EMIT_HITCH_LOGGING: AtomicBool = AtomicBool::new(false);

/// Globally enable or disable hitch reporting.
pub fn set_hitch_logging(enabled: bool) {
    EMIT_HITCH_LOGGING.store(enabled, Ordering::Relaxed);
}

pub fn hitch_logging_enabled() -> bool {
    EMIT_HITCH_LOGGING.load(Ordering::Relaxed)
}

/// Guard that reports sections running past their threshold.
pub struct HitchWatchdog {
    label: &'static str,
    threshold_us: u64,
    start: Instant,
}

impl HitchWatchdog {
    pub fn new(label: &'static str, threshold_us: u64) -> Self {
        HitchWatchdog {
            label,
            threshold_us,
            start: Instant::now(),
        }
    }
}

impl Drop for HitchWatchdog {
    fn drop(&mut self) {
        if !hitch_logging_enabled() {
            return;
        }
        let elapsed_us = self.start.elapsed().as_micros() as u64;
        if elapsed_us > self.threshold_us {
            log::warn!(
                "{}: hitch detected, took {}us (threshold {}us)",
                self.label,
                elapsed_us,
                self.threshold_us
            );
        }
    }
}
