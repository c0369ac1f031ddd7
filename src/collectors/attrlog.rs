//! Reader for smartd attribute logs (`smartd -A`), one CSV per drive:
//!
//! ```text
//! attrlog.WDC_WD80EFAX-68KNBN0-1RJE48WM.ata.csv
//!   2025-06-12 06:43:41;	1;100;0;	5;100;0;	194;69;31;
//! attrlog.Samsung_SSD_980-S64DNX0R123456-n1.nvme.csv
//!   2025-06-12 06:43:41;	temperature;57;	available_spare;100%;
//! ```
//!
//! Only splitting happens here. Decoding is the normalizer's job.

use crate::models::raw::{DriveLog, RawField, RawRecord};
use crate::models::smart::DriveFamily;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const FILE_PREFIX: &str = "attrlog.";

/// (serial, model, family) from an attrlog file name.
pub fn parse_file_name(name: &str) -> Option<(String, String, DriveFamily)> {
    let rest = name.strip_prefix(FILE_PREFIX)?.strip_suffix(".csv")?;
    let (stem, suffix) = rest.rsplit_once('.')?;
    let family = DriveFamily::from_suffix(suffix)?;

    // NVMe logs carry a namespace suffix: MODEL-SERIAL-n1
    let stem = match family {
        DriveFamily::Nvme => match stem.rsplit_once("-n") {
            Some((head, ns)) if !ns.is_empty() && ns.bytes().all(|b| b.is_ascii_digit()) => head,
            _ => stem,
        },
        DriveFamily::Ata => stem,
    };

    let (model, serial) = match stem.rsplit_once('-') {
        Some((m, s)) if !s.is_empty() => (m, s),
        _ => (stem, stem),
    };
    if serial.is_empty() {
        return None;
    }
    Some((serial.to_string(), model.to_string(), family))
}

/// Split one log line. Blank lines give None; every other line gives a record,
/// even if its fields later turn out to be garbage.
pub fn parse_line(line: &str, family: DriveFamily, serial: &str) -> Option<RawRecord> {
    let mut parts: Vec<&str> = line.split(';').map(str::trim).collect();
    while parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    let (timestamp, rest) = parts.split_first()?;

    let width = match family {
        DriveFamily::Ata  => 3,
        DriveFamily::Nvme => 2,
    };
    let fields = rest
        .chunks(width)
        .map(|c| {
            let at = |i: usize| c.get(i).copied().unwrap_or("");
            match family {
                DriveFamily::Ata  => RawField::ata(at(0), at(1), at(2)),
                DriveFamily::Nvme => RawField::nvme(at(0), at(1)),
            }
        })
        .collect();

    Some(RawRecord {
        serial:    Some(serial.to_string()),
        timestamp: timestamp.to_string(),
        fields,
    })
}

/// Build a `DriveLog` from a file's name and contents. None if the name is
/// not an attrlog name.
pub fn log_from_contents(file_name: &str, content: &str) -> Option<DriveLog> {
    let (serial, model, family) = parse_file_name(file_name)?;
    let records = content
        .lines()
        .filter_map(|l| parse_line(l, family, &serial))
        .collect();
    Some(DriveLog {
        serial,
        model: Some(model),
        family,
        source: Some(file_name.to_string()),
        records,
    })
}

/// Read every attrlog in `dir`, ordered by file name.
///
/// An unreadable directory is an error; an unreadable file is skipped.
pub fn read_dir(dir: &Path) -> Result<Vec<DriveLog>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot read log directory {}", dir.display()))?;

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with(FILE_PREFIX) && n.ends_with(".csv"))
        .collect();
    names.sort();

    let mut logs = Vec::with_capacity(names.len());
    for name in names {
        let content = match fs::read_to_string(dir.join(&name)) {
            Ok(c)  => c,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "skipping unreadable log");
                continue;
            }
        };
        match log_from_contents(&name, &content) {
            Some(log) => logs.push(log),
            None      => tracing::warn!(file = %name, "unrecognised attrlog name, skipped"),
        }
    }
    tracing::info!(dir = %dir.display(), drives = logs.len(), "attribute logs read");
    Ok(logs)
}
