use crate::analysis::classify;
use crate::models::smart::{AttributeId, AttributeReading, DriveFamily, RawValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-level verdict. Ordered so the worst of a set is its `max`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Healthy  => "  OK",
            HealthStatus::Warning  => "WARN",
            HealthStatus::Critical => "CRIT",
        }
    }

    /// Nagios-style exit code: 0 OK, 1 WARNING, 2 CRITICAL.
    pub fn exit_code(&self) -> i32 {
        match self {
            HealthStatus::Healthy  => 0,
            HealthStatus::Warning  => 1,
            HealthStatus::Critical => 2,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim())
    }
}

/// Warning / critical temperature pair in °C. `warning <= critical` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSet {
    warning:  i32,
    critical: i32,
}

impl ThresholdSet {
    pub const ATA_DEFAULT:  ThresholdSet = ThresholdSet { warning: 60, critical: 70 };
    pub const NVME_DEFAULT: ThresholdSet = ThresholdSet { warning: 85, critical: 95 };

    /// None when the pair is out of order.
    pub fn new(warning: i32, critical: i32) -> Option<Self> {
        (warning <= critical).then_some(Self { warning, critical })
    }

    pub fn family_default(family: DriveFamily) -> Self {
        match family {
            DriveFamily::Ata  => Self::ATA_DEFAULT,
            DriveFamily::Nvme => Self::NVME_DEFAULT,
        }
    }

    pub fn warning(&self) -> i32  { self.warning }
    pub fn critical(&self) -> i32 { self.critical }
}

/// Where a drive's thresholds came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdSource {
    Live,
    #[default]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaState {
    New,
    Existing,
}

/// How one tracked error attribute moved across the window edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDelta {
    pub attribute: AttributeId,
    /// Value the latest reading was compared against, if any.
    pub baseline:  Option<RawValue>,
    pub latest:    RawValue,
    pub state:     DeltaState,
}

/// Latest informational counters. Display only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveInfo {
    pub power_on_hours:      Option<i64>,
    pub power_cycles:        Option<i64>,
    pub available_spare_pct: Option<f64>,
    pub percentage_used:     Option<f64>,
}

/// Per-drive record of what was dropped or approximated along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveDiagnostics {
    pub rows_total:                usize,
    pub rows_dropped:              usize,
    pub records_missing_serial:    usize,
    pub fields_malformed:          usize,
    pub no_data:                   bool,
    pub threshold_source:          ThresholdSource,
    pub threshold_fallback_reason: Option<String>,
}

/// One physical drive and its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub serial:      String,
    pub model:       Option<String>,
    pub family:      DriveFamily,
    pub device_path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<AttributeReading>,

    pub temperature_current:    Option<i32>,
    pub temperature_max_window: Option<i32>,
    pub temperature_warning:    Option<i32>,
    pub temperature_critical:   Option<i32>,

    pub errors_24h_new:      u32,
    pub errors_24h_existing: u32,
    pub error_deltas:        Vec<ErrorDelta>,

    pub info:        DriveInfo,
    pub diagnostics: DriveDiagnostics,

    health: HealthStatus,
}

impl Drive {
    pub fn new(serial: impl Into<String>, family: DriveFamily) -> Self {
        Self {
            serial:                 serial.into(),
            model:                  None,
            family,
            device_path:            None,
            history:                Vec::new(),
            temperature_current:    None,
            temperature_max_window: None,
            temperature_warning:    None,
            temperature_critical:   None,
            errors_24h_new:         0,
            errors_24h_existing:    0,
            error_deltas:           Vec::new(),
            info:                   DriveInfo::default(),
            diagnostics:            DriveDiagnostics { no_data: true, ..Default::default() },
            health:                 HealthStatus::Healthy,
        }
    }

    pub fn health(&self) -> HealthStatus {
        self.health
    }

    /// Thresholds used for classification: the resolved pair when both are
    /// present, otherwise the family default.
    pub fn thresholds(&self) -> ThresholdSet {
        match (self.temperature_warning, self.temperature_critical) {
            (Some(w), Some(c)) => ThresholdSet::new(w, c)
                .unwrap_or_else(|| ThresholdSet::family_default(self.family)),
            _ => ThresholdSet::family_default(self.family),
        }
    }

    pub fn set_thresholds(&mut self, set: ThresholdSet) {
        self.temperature_warning  = Some(set.warning());
        self.temperature_critical = Some(set.critical());
        self.reclassify();
    }

    /// Recompute `health` from the current field values.
    pub fn reclassify(&mut self) {
        self.health = classify::classify(self, &self.thresholds());
    }

    /// Drop the reading history (keeps JSON output small). Verdict unaffected.
    pub fn without_history(mut self) -> Self {
        self.history = Vec::new();
        self
    }

    pub fn display_name(&self) -> &str {
        self.device_path
            .as_deref()
            .map(|p| p.strip_prefix("/dev/").unwrap_or(p))
            .unwrap_or(&self.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_orders_worst_last() {
        assert!(HealthStatus::Healthy < HealthStatus::Warning);
        assert!(HealthStatus::Warning < HealthStatus::Critical);
        let worst = [HealthStatus::Warning, HealthStatus::Critical, HealthStatus::Healthy]
            .into_iter()
            .max();
        assert_eq!(worst, Some(HealthStatus::Critical));
    }

    #[test]
    fn threshold_set_rejects_inverted_pair() {
        assert!(ThresholdSet::new(80, 70).is_none());
        assert_eq!(ThresholdSet::new(70, 70).map(|t| t.critical()), Some(70));
    }

    #[test]
    fn family_defaults() {
        assert_eq!(ThresholdSet::family_default(DriveFamily::Ata), ThresholdSet::new(60, 70).unwrap());
        assert_eq!(ThresholdSet::family_default(DriveFamily::Nvme), ThresholdSet::new(85, 95).unwrap());
    }

    #[test]
    fn setting_thresholds_reclassifies() {
        let mut d = Drive::new("S1", DriveFamily::Ata);
        d.temperature_current = Some(50);
        d.reclassify();
        assert_eq!(d.health(), HealthStatus::Healthy);
        d.set_thresholds(ThresholdSet::new(45, 55).unwrap());
        assert_eq!(d.health(), HealthStatus::Warning);
    }

    #[test]
    fn display_name_prefers_device() {
        let mut d = Drive::new("1RJE48WM", DriveFamily::Ata);
        assert_eq!(d.display_name(), "1RJE48WM");
        d.device_path = Some("/dev/sda".into());
        assert_eq!(d.display_name(), "sda");
    }
}
