use crate::models::drive::{Drive, HealthStatus};
use crate::models::smart::DriveFamily;
use crate::models::system::SystemHealth;
use chrono::NaiveDateTime;

/// Fold per-drive verdicts into the system summary. Drive order is kept.
pub fn aggregate(drives: Vec<Drive>, analyzed_at: NaiveDateTime) -> SystemHealth {
    let count = |status: HealthStatus| drives.iter().filter(|d| d.health() == status).count();

    SystemHealth {
        total_drives:        drives.len(),
        critical_drives:     count(HealthStatus::Critical),
        warning_drives:      count(HealthStatus::Warning),
        healthy_drives:      count(HealthStatus::Healthy),
        overall_status:      drives.iter().map(Drive::health).max().unwrap_or_default(),
        ata_drives:          drives.iter().filter(|d| d.family == DriveFamily::Ata).count(),
        nvme_drives:         drives.iter().filter(|d| d.family == DriveFamily::Nvme).count(),
        max_temperature:     drives.iter().filter_map(|d| d.temperature_current).max(),
        total_errors_new:    drives.iter().map(|d| d.errors_24h_new).sum(),
        drives_without_data: drives.iter().filter(|d| d.diagnostics.no_data).count(),
        analyzed_at,
        partial:             false,
        drives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-12 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn drive(serial: &str, family: DriveFamily, temp: i32, new: u32) -> Drive {
        let mut d = Drive::new(serial, family);
        d.temperature_current = Some(temp);
        d.errors_24h_new = new;
        d.diagnostics.no_data = false;
        d.reclassify();
        d
    }

    #[test]
    fn empty_system_is_healthy() {
        let sys = aggregate(Vec::new(), now());
        assert_eq!(sys.total_drives, 0);
        assert_eq!(sys.overall_status, HealthStatus::Healthy);
        assert_eq!(sys.max_temperature, None);
    }

    #[test]
    fn one_critical_one_healthy() {
        let sys = aggregate(
            vec![
                drive("A", DriveFamily::Ata, 72, 0),
                drive("B", DriveFamily::Nvme, 40, 0),
            ],
            now(),
        );
        assert_eq!(sys.overall_status, HealthStatus::Critical);
        assert_eq!(
            (sys.critical_drives, sys.warning_drives, sys.healthy_drives, sys.total_drives),
            (1, 0, 1, 2)
        );
        assert_eq!((sys.ata_drives, sys.nvme_drives), (1, 1));
        assert_eq!(sys.max_temperature, Some(72));
    }

    #[test]
    fn counts_sum_and_order_is_kept() {
        let drives = vec![
            drive("C", DriveFamily::Ata, 30, 2),
            drive("A", DriveFamily::Ata, 65, 0),
            drive("B", DriveFamily::Ata, 30, 0),
        ];
        let sys = aggregate(drives, now());
        assert_eq!(sys.critical_drives + sys.warning_drives + sys.healthy_drives, sys.total_drives);
        let order: Vec<_> = sys.drives.iter().map(|d| d.serial.as_str()).collect();
        assert_eq!(order, ["C", "A", "B"]);
        assert_eq!(sys.total_errors_new, 2);
        assert_eq!(sys.overall_status, HealthStatus::Critical);
    }
}
