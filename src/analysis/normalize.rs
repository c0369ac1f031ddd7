use crate::models::drive::Drive;
use crate::models::raw::{DriveLog, RawField, RawRecord};
use crate::models::smart::{AttributeId, AttributeReading, DriveFamily, RawValue};
use crate::models::DeviceMap;
use chrono::NaiveDateTime;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Decode a counter or gauge. Accepts `12`, `1,234`, `0x04`, `37.5` and `100%`.
pub fn parse_value(s: &str) -> Option<RawValue> {
    let s = s.trim().trim_end_matches('%').replace(',', "");
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(RawValue::Integer);
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(RawValue::Integer(v));
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(RawValue::Decimal)
}

fn decode_field(
    family: DriveFamily,
    timestamp: NaiveDateTime,
    field: &RawField,
) -> Option<AttributeReading> {
    match family {
        DriveFamily::Ata => {
            let id = field.key.trim().parse::<u32>().ok()?;
            let normalized = match field.normalized.as_deref() {
                Some(n) => Some(n.trim().parse::<i64>().ok()?),
                None    => None,
            };
            let raw = field.value.trim().parse::<i64>().ok()?;
            Some(AttributeReading {
                timestamp,
                attribute_id:     AttributeId::Ata(id),
                raw_value:        RawValue::Integer(raw),
                normalized_value: normalized,
            })
        }
        DriveFamily::Nvme => {
            let id = AttributeId::nvme(&field.key);
            if matches!(&id, AttributeId::Nvme(name) if name.is_empty()) {
                return None;
            }
            Some(AttributeReading {
                timestamp,
                attribute_id:     id,
                raw_value:        parse_value(&field.value)?,
                normalized_value: None,
            })
        }
    }
}

/// Turn one drive's raw log into a `Drive` with a chronological history.
///
/// Bad rows and fields are dropped and counted in `diagnostics`; nothing here
/// fails the drive. Readings sharing a timestamp keep their input order, so
/// the later record wins wherever "latest" is asked for.
pub fn normalize(log: &DriveLog, mapping: Option<&DeviceMap>) -> Drive {
    let mut drive = Drive::new(log.serial.clone(), log.family);
    drive.model = log.model.clone();
    drive.device_path = mapping.and_then(|m| m.get(&log.serial)).cloned();

    let diag = &mut drive.diagnostics;
    diag.rows_total = log.records.len();

    for record in &log.records {
        if !record_belongs(record, &log.serial) {
            diag.records_missing_serial += 1;
            continue;
        }
        let Some(timestamp) = parse_timestamp(&record.timestamp) else {
            tracing::debug!(serial = %log.serial, timestamp = %record.timestamp, "unparseable timestamp");
            diag.rows_dropped += 1;
            continue;
        };

        let before = drive.history.len();
        for field in &record.fields {
            match decode_field(log.family, timestamp, field) {
                Some(reading) => drive.history.push(reading),
                None => {
                    tracing::debug!(serial = %log.serial, key = %field.key, value = %field.value, "malformed field");
                    diag.fields_malformed += 1;
                }
            }
        }
        if drive.history.len() == before {
            diag.rows_dropped += 1;
        }
    }

    drive.history.sort_by_key(|r| r.timestamp);
    drive.diagnostics.no_data = drive.history.is_empty();

    let d = &drive.diagnostics;
    if d.records_missing_serial > 0 {
        tracing::warn!(
            serial = %log.serial, source = ?log.source, dropped = d.records_missing_serial,
            "records without a matching serial dropped"
        );
    }
    if d.rows_dropped > 0 || d.fields_malformed > 0 {
        tracing::warn!(
            serial = %log.serial, source = ?log.source,
            rows_dropped = d.rows_dropped, fields_malformed = d.fields_malformed,
            "malformed log input skipped"
        );
    }
    if d.no_data {
        tracing::info!(serial = %log.serial, "no readings for drive");
    }

    drive.reclassify();
    drive
}

/// Newest parseable record timestamp across all logs.
pub fn latest_reading_time(logs: &[DriveLog]) -> Option<NaiveDateTime> {
    logs.iter()
        .flat_map(|log| log.records.iter())
        .filter_map(|r| parse_timestamp(&r.timestamp))
        .max()
}

fn record_belongs(record: &RawRecord, serial: &str) -> bool {
    match record.serial.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s == serial,
        _ => false,
    }
}
