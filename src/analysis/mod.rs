//! Health classification core.
//!
//! `normalize` -> (`window` + `thresholds`) -> `classify` -> `aggregate`.
//! Everything except the injected [`LiveQuery`] is a pure function of its input.

pub mod aggregate;
pub mod classify;
pub mod normalize;
pub mod thresholds;
pub mod window;

pub use thresholds::{LiveQuery, QueryError, ResolverConfig};
pub use window::TrackedAttributes;

use crate::models::drive::Drive;
use crate::models::raw::DriveLog;
use crate::models::system::SystemHealth;
use crate::models::DeviceMap;
use chrono::{NaiveDateTime, TimeDelta};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared run-cancellation switch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub window:     TimeDelta,
    pub tracked:    TrackedAttributes,
    pub thresholds: ResolverConfig,
    /// Per-drive worker threads; 0 or 1 runs inline.
    pub jobs:       usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            window:     TimeDelta::hours(window::DEFAULT_WINDOW_HOURS),
            tracked:    TrackedAttributes::default(),
            thresholds: ResolverConfig::default(),
            jobs:       1,
        }
    }
}

/// Analyze every drive with default options.
pub fn analyze(
    logs: Vec<DriveLog>,
    now: NaiveDateTime,
    mapping: Option<&DeviceMap>,
    live: Option<&dyn LiveQuery>,
) -> SystemHealth {
    analyze_with(logs, now, mapping, live, &AnalysisOptions::default(), &CancelFlag::new())
}

/// Analyze every drive and fold the verdicts into a [`SystemHealth`].
///
/// Drives keep their input order. Logs sharing a serial are merged into the
/// first one. Once `cancel` fires, drives not yet started are left out and
/// the result is marked `partial`.
pub fn analyze_with(
    logs: Vec<DriveLog>,
    now: NaiveDateTime,
    mapping: Option<&DeviceMap>,
    live: Option<&dyn LiveQuery>,
    opts: &AnalysisOptions,
    cancel: &CancelFlag,
) -> SystemHealth {
    let logs = merge_by_serial(logs);
    let run = |log: &DriveLog| analyze_drive(log, now, mapping, live, opts, cancel);

    let slots: Vec<Option<Drive>> = if opts.jobs <= 1 || logs.len() <= 1 {
        logs.iter().map(run).collect()
    } else {
        let chunk = logs.len().div_ceil(opts.jobs);
        std::thread::scope(|s| {
            let handles: Vec<_> = logs
                .chunks(chunk)
                .map(|part| s.spawn(move || part.iter().map(run).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(v) => v,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    };

    let partial = slots.iter().any(Option::is_none);
    let drives: Vec<Drive> = slots.into_iter().flatten().collect();
    if partial {
        tracing::warn!(completed = drives.len(), total = logs.len(), "analysis cancelled; result is partial");
    }

    let mut system = aggregate::aggregate(drives, now);
    system.partial = partial;
    system
}

/// Full pipeline for one drive. None if the run was cancelled before it started.
pub fn analyze_drive(
    log: &DriveLog,
    now: NaiveDateTime,
    mapping: Option<&DeviceMap>,
    live: Option<&dyn LiveQuery>,
    opts: &AnalysisOptions,
    cancel: &CancelFlag,
) -> Option<Drive> {
    if cancel.is_cancelled() {
        return None;
    }
    let mut drive = normalize::normalize(log, mapping);
    window::analyze_window(&drive.history, now, opts.window, &opts.tracked).apply_to(&mut drive);
    thresholds::resolve(&drive, live, &opts.thresholds, cancel).apply_to(&mut drive);
    Some(drive)
}

fn merge_by_serial(logs: Vec<DriveLog>) -> Vec<DriveLog> {
    let mut merged: Vec<DriveLog> = Vec::with_capacity(logs.len());
    for log in logs {
        match merged.iter_mut().find(|m| m.serial == log.serial) {
            None => merged.push(log),
            Some(first) if first.family != log.family => {
                tracing::warn!(
                    serial = %log.serial, source = ?log.source,
                    "serial already seen as {}; log ignored", first.family
                );
            }
            Some(first) => {
                tracing::warn!(serial = %log.serial, source = ?log.source, "duplicate serial merged");
                first.records.extend(log.records);
            }
        }
    }
    merged
}
