use crate::analysis::{AnalysisOptions, ResolverConfig, TrackedAttributes};
use crate::models::drive::ThresholdSet;
use crate::models::smart::{canonical_nvme_name, DriveFamily};
use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub thresholds: ThresholdsConfig,

    #[serde(default)]
    pub attributes: AttributesConfig,

    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Where the observation window ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WindowAnchor {
    /// Current wall-clock time.
    #[default]
    Clock,
    /// Newest reading found in the logs (for logs copied off the NAS).
    Latest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Length of the "recent" window in hours
    pub window_hours:      i64,
    /// Budget for one live threshold query
    pub query_timeout_sec: u64,
    /// Parallel per-drive workers
    pub jobs:              usize,
    pub anchor:            WindowAnchor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyThresholds {
    pub warning:  i32,
    pub critical: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub ata:  FamilyThresholds,
    pub nvme: FamilyThresholds,
}

/// Error attributes whose growth inside the window marks a drive critical.
///
/// Example in nashealth.toml:
/// ```toml
/// [attributes]
/// ata_error_ids    = [5, 197, 198, 199]
/// nvme_error_names = ["media_and_data_integrity_errors", "critical_warning"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributesConfig {
    pub ata_error_ids:    Vec<u32>,
    pub nvme_error_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Attribute log directory on the NAS
    pub smart_dir:           String,
    /// Extra ssh arguments, e.g. ["-i", "/root/.ssh/nas"]
    pub ssh_options:         Vec<String>,
    /// Budget for one remote listing / file fetch
    pub command_timeout_sec: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { window_hours: 24, query_timeout_sec: 10, jobs: 4, anchor: WindowAnchor::Clock }
    }
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        let pair = |t: ThresholdSet| FamilyThresholds { warning: t.warning(), critical: t.critical() };
        Self { ata: pair(ThresholdSet::ATA_DEFAULT), nvme: pair(ThresholdSet::NVME_DEFAULT) }
    }
}

impl Default for AttributesConfig {
    fn default() -> Self {
        let t = TrackedAttributes::default();
        Self { ata_error_ids: t.ata, nvme_error_names: t.nvme }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            smart_dir:           "/var/lib/smartmontools".into(),
            ssh_options:         Vec::new(),
            command_timeout_sec: 60,
        }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load from an explicit path (errors are fatal) or from the default
    /// location (missing or broken file falls back to defaults).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return try_load(p);
        }
        let Some(default_path) = Self::config_path() else {
            return Ok(Config::default());
        };
        if !default_path.exists() {
            // Write defaults on first run (best-effort)
            let _ = try_write_defaults();
            return Ok(Config::default());
        }
        Ok(try_load(&default_path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring unreadable config, using defaults");
            Config::default()
        }))
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nashealth").join("nashealth.toml"))
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        let a = &self.analysis;
        AnalysisOptions {
            // Too large for TimeDelta means "the whole history"
            window:     TimeDelta::try_hours(a.window_hours.max(1)).unwrap_or(TimeDelta::MAX),
            tracked:    TrackedAttributes {
                ata:  self.attributes.ata_error_ids.clone(),
                nvme: self.attributes.nvme_error_names.iter().map(|n| canonical_nvme_name(n)).collect(),
            },
            thresholds: ResolverConfig {
                ata:     self.thresholds.resolved(DriveFamily::Ata),
                nvme:    self.thresholds.resolved(DriveFamily::Nvme),
                timeout: Duration::from_secs(a.query_timeout_sec.max(1)),
            },
            jobs:       a.jobs.max(1),
        }
    }
}

impl ThresholdsConfig {
    /// Configured pair, or the built-in default if it is out of order.
    pub fn resolved(&self, family: DriveFamily) -> ThresholdSet {
        let cfg = match family {
            DriveFamily::Ata  => &self.ata,
            DriveFamily::Nvme => &self.nvme,
        };
        ThresholdSet::new(cfg.warning, cfg.critical).unwrap_or_else(|| {
            tracing::warn!(
                %family, warning = cfg.warning, critical = cfg.critical,
                "configured thresholds out of order, using built-in defaults"
            );
            ThresholdSet::family_default(family)
        })
    }
}

fn try_load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# nashealth configuration\n# Generated on first run; edit freely\n\n{}", text))?;
    Ok(())
}
