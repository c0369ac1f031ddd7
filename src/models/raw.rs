use crate::models::smart::DriveFamily;
use serde::{Deserialize, Serialize};

/// One undecoded field of a log line: an ATA `id;norm;raw` triplet
/// (`normalized` set) or an NVMe `name;value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawField {
    pub key:        String,
    pub normalized: Option<String>,
    pub value:      String,
}

impl RawField {
    pub fn ata(id: &str, normalized: &str, raw: &str) -> Self {
        Self { key: id.to_string(), normalized: Some(normalized.to_string()), value: raw.to_string() }
    }

    pub fn nvme(name: &str, value: &str) -> Self {
        Self { key: name.to_string(), normalized: None, value: value.to_string() }
    }
}

/// One log line as the reader saw it. Nothing is parsed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub serial:    Option<String>,
    pub timestamp: String,
    pub fields:    Vec<RawField>,
}

/// Everything read for one drive, tagged with its family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveLog {
    pub serial:  String,
    pub model:   Option<String>,
    pub family:  DriveFamily,
    /// Where the records came from (file name), for log messages.
    pub source:  Option<String>,
    pub records: Vec<RawRecord>,
}

impl DriveLog {
    pub fn new(serial: impl Into<String>, family: DriveFamily) -> Self {
        Self { serial: serial.into(), model: None, family, source: None, records: Vec::new() }
    }
}
