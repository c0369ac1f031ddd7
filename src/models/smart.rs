use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Drive protocol family; decides how attribute identifiers are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveFamily {
    Ata,
    Nvme,
}

impl DriveFamily {
    pub fn label(&self) -> &'static str {
        match self {
            DriveFamily::Ata  => " ATA",
            DriveFamily::Nvme => "NVMe",
        }
    }

    /// Family from the attrlog file suffix ("ata" / "nvme").
    pub fn from_suffix(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ata"  => Some(DriveFamily::Ata),
            "nvme" => Some(DriveFamily::Nvme),
            _      => None,
        }
    }
}

impl fmt::Display for DriveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().trim())
    }
}

/// What an attribute means, independent of how the family names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Temperature,
    ReadErrorRate,
    ReallocatedSectors,
    PendingSectors,
    OfflineUncorrectable,
    CrcErrors,
    MediaErrors,
    ErrorLogEntries,
    CriticalWarning,
    UnsafeShutdowns,
    PowerOnHours,
    PowerCycles,
    AvailableSpare,
    PercentageUsed,
    Other,
}

/// Family-tagged attribute identifier: numeric for ATA, named for NVMe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "family", content = "id", rename_all = "lowercase")]
pub enum AttributeId {
    Ata(u32),
    Nvme(String),
}

impl AttributeId {
    /// NVMe identifier with the name folded to snake_case
    /// ("Media and Data Integrity Errors" -> `media_and_data_integrity_errors`).
    pub fn nvme(name: &str) -> Self {
        AttributeId::Nvme(canonical_nvme_name(name))
    }

    pub fn family(&self) -> DriveFamily {
        match self {
            AttributeId::Ata(_)  => DriveFamily::Ata,
            AttributeId::Nvme(_) => DriveFamily::Nvme,
        }
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            AttributeId::Ata(id) => match id {
                1         => AttributeKind::ReadErrorRate,
                5         => AttributeKind::ReallocatedSectors,
                9         => AttributeKind::PowerOnHours,
                12        => AttributeKind::PowerCycles,
                190 | 194 => AttributeKind::Temperature,
                197       => AttributeKind::PendingSectors,
                198       => AttributeKind::OfflineUncorrectable,
                199       => AttributeKind::CrcErrors,
                _         => AttributeKind::Other,
            },
            AttributeId::Nvme(name) => match name.as_str() {
                "temperature"                     => AttributeKind::Temperature,
                "media_and_data_integrity_errors" => AttributeKind::MediaErrors,
                "error_information_log_entries"   => AttributeKind::ErrorLogEntries,
                "critical_warning"                => AttributeKind::CriticalWarning,
                "unsafe_shutdowns"                => AttributeKind::UnsafeShutdowns,
                "power_on_hours"                  => AttributeKind::PowerOnHours,
                "power_cycles"                    => AttributeKind::PowerCycles,
                "available_spare"                 => AttributeKind::AvailableSpare,
                "percentage_used"                 => AttributeKind::PercentageUsed,
                _                                 => AttributeKind::Other,
            },
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeId::Ata(id)    => write!(f, "{}", id),
            AttributeId::Nvme(name) => f.write_str(name),
        }
    }
}

pub fn canonical_nvme_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// A raw attribute value; ATA counters are integers, NVMe percentages may not be.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Decimal(f64),
}

impl RawValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            RawValue::Integer(v) => v as f64,
            RawValue::Decimal(v) => v,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            RawValue::Integer(v) => v,
            RawValue::Decimal(v) => v as i64,
        }
    }

    pub fn is_nonzero(&self) -> bool {
        self.as_f64() != 0.0
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Integer(v) => write!(f, "{}", v),
            RawValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// One timestamped attribute reading from a drive's attribute log.
///
/// Timestamps are the naive wall-clock time of the host that wrote the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeReading {
    pub timestamp:        NaiveDateTime,
    pub attribute_id:     AttributeId,
    pub raw_value:        RawValue,
    /// Vendor-normalized value (ATA only).
    pub normalized_value: Option<i64>,
}

impl AttributeReading {
    pub fn kind(&self) -> AttributeKind {
        self.attribute_id.kind()
    }

    /// Temperature in °C if this is a temperature-bearing reading.
    /// ATA packs min/max into the upper bytes; the current value is the low byte.
    pub fn temperature_celsius(&self) -> Option<i32> {
        if self.kind() != AttributeKind::Temperature {
            return None;
        }
        match self.attribute_id {
            AttributeId::Ata(_)  => Some((self.raw_value.as_i64() & 0xFF) as i32),
            AttributeId::Nvme(_) => Some(self.raw_value.as_i64() as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2025-06-12 06:43:41", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn nvme_names_fold_to_snake_case() {
        assert_eq!(canonical_nvme_name("Media and Data Integrity Errors"), "media_and_data_integrity_errors");
        assert_eq!(canonical_nvme_name(" Critical Warning "), "critical_warning");
        assert_eq!(canonical_nvme_name("percentage_used"), "percentage_used");
        assert_eq!(AttributeId::nvme("Temperature").kind(), AttributeKind::Temperature);
    }

    #[test]
    fn ata_ids_map_to_kinds() {
        assert_eq!(AttributeId::Ata(194).kind(), AttributeKind::Temperature);
        assert_eq!(AttributeId::Ata(190).kind(), AttributeKind::Temperature);
        assert_eq!(AttributeId::Ata(5).kind(), AttributeKind::ReallocatedSectors);
        assert_eq!(AttributeId::Ata(197).kind(), AttributeKind::PendingSectors);
        assert_eq!(AttributeId::Ata(198).kind(), AttributeKind::OfflineUncorrectable);
        assert_eq!(AttributeId::Ata(231).kind(), AttributeKind::Other);
    }

    #[test]
    fn ata_temperature_uses_low_byte() {
        // 0x0028_0014_0020: min 20, max 40, current 32
        let r = AttributeReading {
            timestamp:        ts(),
            attribute_id:     AttributeId::Ata(194),
            raw_value:        RawValue::Integer(0x0028_0014_0020),
            normalized_value: Some(68),
        };
        assert_eq!(r.temperature_celsius(), Some(32));
    }

    #[test]
    fn non_temperature_reading_has_no_temperature() {
        let r = AttributeReading {
            timestamp:        ts(),
            attribute_id:     AttributeId::Ata(5),
            raw_value:        RawValue::Integer(3),
            normalized_value: Some(100),
        };
        assert_eq!(r.temperature_celsius(), None);
    }
}
