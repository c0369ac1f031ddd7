use crate::models::drive::{DeltaState, Drive, DriveInfo, ErrorDelta};
use crate::models::smart::{AttributeId, AttributeKind, AttributeReading, RawValue};
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;

pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Error attributes whose movement is tracked across the window edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedAttributes {
    pub ata:  Vec<u32>,
    pub nvme: Vec<String>,
}

impl Default for TrackedAttributes {
    fn default() -> Self {
        Self {
            ata:  vec![
                5,   // Reallocated_Sector_Ct
                197, // Current_Pending_Sector
                198, // Offline_Uncorrectable
            ],
            nvme: vec![
                "media_and_data_integrity_errors".into(),
                "critical_warning".into(),
            ],
        }
    }
}

impl TrackedAttributes {
    pub fn contains(&self, id: &AttributeId) -> bool {
        match id {
            AttributeId::Ata(n)     => self.ata.contains(n),
            AttributeId::Nvme(name) => self.nvme.iter().any(|t| t == name),
        }
    }
}

/// What the window analysis found for one drive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSummary {
    pub errors_new:             u32,
    pub errors_existing:        u32,
    pub temperature_current:    Option<i32>,
    pub temperature_max_window: Option<i32>,
    pub deltas:                 Vec<ErrorDelta>,
    pub info:                   DriveInfo,
}

impl WindowSummary {
    /// Copy the findings onto the drive and recompute its verdict.
    pub fn apply_to(self, drive: &mut Drive) {
        drive.errors_24h_new         = self.errors_new;
        drive.errors_24h_existing    = self.errors_existing;
        drive.temperature_current    = self.temperature_current;
        drive.temperature_max_window = self.temperature_max_window;
        drive.error_deltas           = self.deltas;
        drive.info                   = self.info;
        drive.reclassify();
    }
}

#[derive(Default)]
struct Series {
    prior_last:   Option<RawValue>,
    recent_first: Option<RawValue>,
    recent_last:  Option<RawValue>,
}

/// Split `history` at `now - window` and classify each tracked error
/// attribute as newly degrading or pre-existing.
///
/// `history` must be chronological; among equal timestamps the later entry
/// is taken as the newer value. Readings at exactly the cutoff count as recent,
/// and so do readings dated after `now` (host clock skew): they are never
/// dropped. A window reaching past the earliest representable time covers
/// the whole history.
pub fn analyze_window(
    history: &[AttributeReading],
    now: NaiveDateTime,
    window: TimeDelta,
    tracked: &TrackedAttributes,
) -> WindowSummary {
    let cutoff = now.checked_sub_signed(window).unwrap_or(NaiveDateTime::MIN);
    let has_prior = history.iter().any(|r| r.timestamp < cutoff);

    let mut series: BTreeMap<&AttributeId, Series> = BTreeMap::new();
    for r in history.iter().filter(|r| tracked.contains(&r.attribute_id)) {
        let s = series.entry(&r.attribute_id).or_default();
        if r.timestamp < cutoff {
            s.prior_last = Some(r.raw_value);
        } else {
            s.recent_first.get_or_insert(r.raw_value);
            s.recent_last = Some(r.raw_value);
        }
    }

    let mut summary = WindowSummary {
        temperature_current:    history.iter().rev().find_map(|r| r.temperature_celsius()),
        temperature_max_window: history
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .filter_map(|r| r.temperature_celsius())
            .max(),
        info: latest_info(history),
        ..Default::default()
    };

    for (id, s) in series {
        let Some(delta) = judge(id, &s, has_prior) else { continue };
        match delta.state {
            DeltaState::New      => summary.errors_new += 1,
            DeltaState::Existing => summary.errors_existing += 1,
        }
        summary.deltas.push(delta);
    }
    summary
}

fn judge(id: &AttributeId, s: &Series, has_prior: bool) -> Option<ErrorDelta> {
    let delta = |baseline: Option<RawValue>, latest: RawValue, state| ErrorDelta {
        attribute: id.clone(),
        baseline,
        latest,
        state,
    };

    match (s.prior_last, s.recent_last) {
        // Nothing inside the window; only an old nonzero value matters.
        (Some(p), None) => p.is_nonzero().then(|| delta(None, p, DeltaState::Existing)),
        (Some(p), Some(r)) => {
            if r.as_f64() > p.as_f64() {
                Some(delta(Some(p), r, DeltaState::New))
            } else {
                p.is_nonzero().then(|| delta(Some(p), r, DeltaState::Existing))
            }
        }
        // Drive was observed before but this attribute was absent: first appearance.
        (None, Some(r)) if has_prior => r.is_nonzero().then(|| delta(None, r, DeltaState::New)),
        // No baseline before the window: compare against the window's own first reading.
        (None, Some(r)) => {
            let first = s.recent_first.unwrap_or(r);
            if r.as_f64() > first.as_f64() {
                Some(delta(Some(first), r, DeltaState::New))
            } else {
                r.is_nonzero().then(|| delta(None, r, DeltaState::Existing))
            }
        }
        (None, None) => None,
    }
}

fn latest_info(history: &[AttributeReading]) -> DriveInfo {
    let latest = |kind: AttributeKind| {
        history.iter().rev().find(|r| r.kind() == kind).map(|r| r.raw_value)
    };
    DriveInfo {
        power_on_hours:      latest(AttributeKind::PowerOnHours).map(|v| v.as_i64()),
        power_cycles:        latest(AttributeKind::PowerCycles).map(|v| v.as_i64()),
        available_spare_pct: latest(AttributeKind::AvailableSpare).map(|v| v.as_f64()),
        percentage_used:     latest(AttributeKind::PercentageUsed).map(|v| v.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn ata(ts: &str, id: u32, raw: i64) -> AttributeReading {
        AttributeReading {
            timestamp:        at(ts),
            attribute_id:     AttributeId::Ata(id),
            raw_value:        RawValue::Integer(raw),
            normalized_value: Some(100),
        }
    }

    fn nvme(ts: &str, name: &str, raw: i64) -> AttributeReading {
        AttributeReading {
            timestamp:        at(ts),
            attribute_id:     AttributeId::nvme(name),
            raw_value:        RawValue::Integer(raw),
            normalized_value: None,
        }
    }

    fn run(history: &[AttributeReading], now: &str) -> WindowSummary {
        analyze_window(history, at(now), TimeDelta::hours(DEFAULT_WINDOW_HOURS), &TrackedAttributes::default())
    }

    #[test]
    fn increase_inside_window_is_new() {
        let h = vec![
            ata("2025-06-10 12:00:00", 5, 2),
            ata("2025-06-12 06:00:00", 5, 3),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (1, 0));
        assert_eq!(s.deltas[0].baseline, Some(RawValue::Integer(2)));
        assert_eq!(s.deltas[0].latest, RawValue::Integer(3));
    }

    #[test]
    fn unchanged_nonzero_is_existing() {
        let h = vec![
            ata("2025-06-10 12:00:00", 197, 4),
            ata("2025-06-12 06:00:00", 197, 4),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 1));
        assert_eq!(s.deltas[0].state, DeltaState::Existing);
    }

    #[test]
    fn zero_counters_report_nothing() {
        let h = vec![
            ata("2025-06-10 12:00:00", 5, 0),
            ata("2025-06-12 06:00:00", 5, 0),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 0));
        assert!(s.deltas.is_empty());
    }

    #[test]
    fn single_nonzero_reading_is_existing_not_new() {
        let h = vec![ata("2025-06-12 06:00:00", 5, 8)];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 1));
    }

    #[test]
    fn increase_with_only_in_window_readings_is_new() {
        let h = vec![
            nvme("2025-06-12 06:43:41", "media_and_data_integrity_errors", 0),
            nvme("2025-06-12 07:43:41", "media_and_data_integrity_errors", 1),
        ];
        let s = run(&h, "2025-06-12 08:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (1, 0));
    }

    #[test]
    fn attribute_appearing_after_prior_observations_is_new() {
        let h = vec![
            ata("2025-06-10 12:00:00", 194, 35),
            ata("2025-06-12 06:00:00", 198, 1),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (1, 0));
    }

    #[test]
    fn old_nonzero_without_recent_reading_is_existing() {
        let h = vec![ata("2025-06-01 12:00:00", 5, 1)];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 1));
    }

    #[test]
    fn counter_drop_is_not_new() {
        let h = vec![
            ata("2025-06-10 12:00:00", 197, 3),
            ata("2025-06-12 06:00:00", 197, 1),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 1));
    }

    #[test]
    fn reading_at_cutoff_counts_as_recent() {
        let h = vec![
            ata("2025-06-10 12:00:00", 5, 0),
            ata("2025-06-11 12:00:00", 5, 1),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!(s.errors_new, 1);
    }

    #[test]
    fn duplicate_timestamps_last_seen_wins() {
        let h = vec![
            ata("2025-06-10 12:00:00", 5, 0),
            ata("2025-06-12 06:00:00", 5, 5),
            ata("2025-06-12 06:00:00", 5, 0),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 0));

        let h = vec![
            ata("2025-06-10 12:00:00", 5, 0),
            ata("2025-06-12 06:00:00", 5, 0),
            ata("2025-06-12 06:00:00", 5, 5),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (1, 0));
    }

    #[test]
    fn untracked_attributes_are_ignored() {
        let h = vec![
            nvme("2025-06-10 12:00:00", "unsafe_shutdowns", 11),
            nvme("2025-06-12 06:00:00", "unsafe_shutdowns", 12),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!((s.errors_new, s.errors_existing), (0, 0));
    }

    #[test]
    fn temperature_is_latest_bearing_reading() {
        let h = vec![
            ata("2025-06-12 06:00:00", 194, 31),
            ata("2025-06-12 07:00:00", 194, 44),
            ata("2025-06-12 08:00:00", 194, 30),
            ata("2025-06-12 09:00:00", 5, 0),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!(s.temperature_current, Some(30));
        assert_eq!(s.temperature_max_window, Some(44));
    }

    #[test]
    fn empty_history_has_no_temperature() {
        let s = run(&[], "2025-06-12 12:00:00");
        assert_eq!(s, WindowSummary::default());
    }

    #[test]
    fn info_counters_take_latest_values() {
        let h = vec![
            nvme("2025-06-12 06:00:00", "power_on_hours", 1747),
            nvme("2025-06-12 07:00:00", "power_on_hours", 1748),
            nvme("2025-06-12 07:00:00", "available_spare", 100),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!(s.info.power_on_hours, Some(1748));
        assert_eq!(s.info.available_spare_pct, Some(100.0));
        assert_eq!(s.info.percentage_used, None);
    }

    #[test]
    fn window_wider_than_the_calendar_covers_everything() {
        let h = vec![
            ata("2020-01-01 00:00:00", 5, 0),
            ata("2025-06-12 06:00:00", 5, 3),
            ata("2025-06-12 06:00:00", 194, 35),
        ];
        let s = analyze_window(&h, at("2025-06-12 12:00:00"), TimeDelta::MAX, &TrackedAttributes::default());
        // no prior readings: the 2020 zero is the in-window baseline
        assert_eq!((s.errors_new, s.errors_existing), (1, 0));
        assert_eq!(s.temperature_max_window, Some(35));
    }

    #[test]
    fn future_dated_readings_count_as_recent() {
        let h = vec![
            ata("2025-06-12 11:00:00", 194, 30),
            ata("2025-06-12 13:00:00", 194, 41),
        ];
        let s = run(&h, "2025-06-12 12:00:00");
        assert_eq!(s.temperature_current, Some(41));
        assert_eq!(s.temperature_max_window, Some(41));
    }
}
