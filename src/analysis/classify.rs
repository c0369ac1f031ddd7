use crate::models::drive::{Drive, HealthStatus, ThresholdSet};

/// Verdict for one drive. First matching rule wins:
///
/// 1. `Critical`: temperature at or above critical, or any new error in the window.
/// 2. `Warning`: temperature at or above warning, or any pre-existing error.
/// 3. `Healthy`: everything else, including a drive with no readings.
pub fn classify(drive: &Drive, thresholds: &ThresholdSet) -> HealthStatus {
    let temp = drive.temperature_current;

    if temp.is_some_and(|t| t >= thresholds.critical()) || drive.errors_24h_new > 0 {
        return HealthStatus::Critical;
    }
    if temp.is_some_and(|t| t >= thresholds.warning()) || drive.errors_24h_existing > 0 {
        return HealthStatus::Warning;
    }
    HealthStatus::Healthy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::smart::DriveFamily;

    fn drive(family: DriveFamily, temp: Option<i32>, new: u32, existing: u32) -> Drive {
        let mut d = Drive::new("S1", family);
        d.temperature_current = temp;
        d.errors_24h_new = new;
        d.errors_24h_existing = existing;
        d
    }

    const ATA: ThresholdSet = ThresholdSet::ATA_DEFAULT;
    const NVME: ThresholdSet = ThresholdSet::NVME_DEFAULT;

    #[test]
    fn ata_warm_drive_is_warning() {
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(65), 0, 0), &ATA), HealthStatus::Warning);
    }

    #[test]
    fn ata_hot_drive_is_critical() {
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(72), 0, 0), &ATA), HealthStatus::Critical);
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(60), 0, 0), &ATA), HealthStatus::Warning);
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(70), 0, 0), &ATA), HealthStatus::Critical);
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(59), 0, 0), &ATA), HealthStatus::Healthy);
    }

    #[test]
    fn new_error_dominates_cool_temperature() {
        assert_eq!(classify(&drive(DriveFamily::Nvme, Some(50), 1, 0), &NVME), HealthStatus::Critical);
    }

    #[test]
    fn new_error_not_masked_by_existing() {
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(30), 1, 2), &ATA), HealthStatus::Critical);
    }

    #[test]
    fn existing_error_is_warning() {
        assert_eq!(classify(&drive(DriveFamily::Ata, Some(30), 0, 1), &ATA), HealthStatus::Warning);
    }

    #[test]
    fn no_data_is_healthy() {
        assert_eq!(classify(&drive(DriveFamily::Nvme, None, 0, 0), &NVME), HealthStatus::Healthy);
    }

    #[test]
    fn stored_health_matches_fresh_classification() {
        let mut d = drive(DriveFamily::Ata, Some(66), 0, 0);
        d.reclassify();
        assert_eq!(d.health(), classify(&d, &d.thresholds()));
    }
}
