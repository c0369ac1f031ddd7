use crate::analysis::CancelFlag;
use crate::models::drive::{Drive, ThresholdSet, ThresholdSource};
use crate::models::smart::DriveFamily;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a live threshold query produced nothing usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("command failed: {0}")]
    Command(String),
    #[error("unparseable reply: {0}")]
    Parse(String),
    #[error("no device path known for drive")]
    NoDevicePath,
    #[error("query cancelled")]
    Cancelled,
}

/// Fetches manufacturer temperature limits for a device.
///
/// Implementations own the transport (local command, SSH, a test double) and
/// must give up after `timeout`.
pub trait LiveQuery: Sync {
    fn query(&self, device_path: &str, family: DriveFamily, timeout: Duration)
        -> Result<ThresholdSet, QueryError>;
}

/// Per-family fallback thresholds plus the live query budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub ata:     ThresholdSet,
    pub nvme:    ThresholdSet,
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ata:     ThresholdSet::ATA_DEFAULT,
            nvme:    ThresholdSet::NVME_DEFAULT,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl ResolverConfig {
    pub fn default_for(&self, family: DriveFamily) -> ThresholdSet {
        match family {
            DriveFamily::Ata  => self.ata,
            DriveFamily::Nvme => self.nvme,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub set:             ThresholdSet,
    pub source:          ThresholdSource,
    pub fallback_reason: Option<String>,
}

impl Resolved {
    pub fn apply_to(self, drive: &mut Drive) {
        drive.diagnostics.threshold_source = self.source;
        drive.diagnostics.threshold_fallback_reason = self.fallback_reason;
        drive.set_thresholds(self.set);
    }
}

/// Thresholds for `drive`: the live pair when the query succeeds, otherwise
/// the family default. Live and default values are never mixed.
pub fn resolve(
    drive: &Drive,
    live: Option<&dyn LiveQuery>,
    config: &ResolverConfig,
    cancel: &CancelFlag,
) -> Resolved {
    let outcome = match (live, drive.device_path.as_deref()) {
        (None, _)          => Err(None),
        (Some(_), None)    => Err(Some(QueryError::NoDevicePath)),
        (Some(_), Some(_)) if cancel.is_cancelled() => Err(Some(QueryError::Cancelled)),
        (Some(q), Some(p)) => q.query(p, drive.family, config.timeout).map_err(Some),
    };

    match outcome {
        Ok(set) => {
            tracing::debug!(
                serial = %drive.serial, warning = set.warning(), critical = set.critical(),
                "live thresholds"
            );
            Resolved { set, source: ThresholdSource::Live, fallback_reason: None }
        }
        Err(err) => {
            let set = config.default_for(drive.family);
            let reason = match err {
                Some(e) => {
                    tracing::info!(
                        serial = %drive.serial, device = ?drive.device_path, error = %e,
                        "live threshold query failed, using {} defaults", drive.family
                    );
                    e.to_string()
                }
                None => "live query not configured".to_string(),
            };
            Resolved { set, source: ThresholdSource::Default, fallback_reason: Some(reason) }
        }
    }
}
