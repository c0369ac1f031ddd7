use crate::analysis::{LiveQuery, QueryError};
use crate::collectors::command::{shell_quote, CommandRunner, RunError};
use crate::models::drive::ThresholdSet;
use crate::models::smart::DriveFamily;
use serde_json::Value;
use std::time::Duration;

const KELVIN_OFFSET: i64 = 273;

/// Live manufacturer limits: `smartctl -x --json` for ATA, `nvme id-ctrl` for NVMe.
pub struct SmartctlQuery<R> {
    runner: R,
}

impl<R: CommandRunner> SmartctlQuery<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> LiveQuery for SmartctlQuery<R> {
    fn query(&self, device_path: &str, family: DriveFamily, timeout: Duration)
        -> Result<ThresholdSet, QueryError>
    {
        let dev = shell_quote(device_path);
        let command = match family {
            DriveFamily::Ata  => format!("smartctl -x --json {}", dev),
            DriveFamily::Nvme => format!("nvme id-ctrl {} -o json", dev),
        };
        let out = self.runner.run(&command, timeout).map_err(|e| match e {
            RunError::Timeout(t) => QueryError::Timeout(t),
            RunError::Cancelled  => QueryError::Cancelled,
            other                => QueryError::Command(format!("{} on {}: {}", command, self.runner.target(), other)),
        })?;
        match family {
            DriveFamily::Ata  => parse_ata_limits(&out),
            DriveFamily::Nvme => parse_nvme_limits(&out),
        }
    }
}

fn json(out: &str) -> Result<Value, QueryError> {
    serde_json::from_str(out).map_err(|e| QueryError::Parse(e.to_string()))
}

fn ordered(warning: i64, critical: i64) -> Result<ThresholdSet, QueryError> {
    let (w, c) = (i32::try_from(warning), i32::try_from(critical));
    match (w, c) {
        (Ok(w), Ok(c)) => ThresholdSet::new(w, c)
            .ok_or_else(|| QueryError::Parse(format!("warning {}°C above critical {}°C", w, c))),
        _ => Err(QueryError::Parse("limit out of range".into())),
    }
}

/// ATA: operating limit is the warning level, the damage limit the critical one.
pub fn parse_ata_limits(out: &str) -> Result<ThresholdSet, QueryError> {
    let v = json(out)?;
    let temp = &v["temperature"];
    let warning = temp["op_limit_max"].as_i64()
        .ok_or_else(|| QueryError::Parse("temperature.op_limit_max missing".into()))?;
    let critical = temp["limit_max"].as_i64()
        .ok_or_else(|| QueryError::Parse("temperature.limit_max missing".into()))?;
    ordered(warning, critical)
}

/// NVMe: WCTEMP / CCTEMP from Identify Controller, in Kelvin. Zero means unreported.
pub fn parse_nvme_limits(out: &str) -> Result<ThresholdSet, QueryError> {
    let v = json(out)?;
    let kelvin = |key: &str| {
        v[key].as_i64()
            .filter(|k| *k > 0)
            .map(|k| k - KELVIN_OFFSET)
            .ok_or_else(|| QueryError::Parse(format!("{} missing", key)))
    };
    ordered(kelvin("wctemp")?, kelvin("cctemp")?)
}
