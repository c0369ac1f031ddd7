use crate::models::drive::{Drive, HealthStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    /// Discovery order.
    pub drives:          Vec<Drive>,
    pub total_drives:    usize,
    pub critical_drives: usize,
    pub warning_drives:  usize,
    pub healthy_drives:  usize,
    pub overall_status:  HealthStatus,

    pub ata_drives:          usize,
    pub nvme_drives:         usize,
    pub max_temperature:     Option<i32>,
    pub total_errors_new:    u32,
    pub drives_without_data: usize,

    /// End of the observation window the run used.
    pub analyzed_at: NaiveDateTime,
    /// True if the run was cancelled before every drive was processed.
    pub partial:     bool,
}

impl SystemHealth {
    pub fn drive(&self, serial: &str) -> Option<&Drive> {
        self.drives.iter().find(|d| d.serial == serial)
    }
}
