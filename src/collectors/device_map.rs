use crate::collectors::command::{shell_quote, CommandRunner};
use crate::models::DeviceMap;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub fn load(path: &Path) -> Result<DeviceMap> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read device map {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid device map {}", path.display()))
}

pub fn save(path: &Path, map: &DeviceMap) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(map)?)
        .with_context(|| format!("cannot write device map {}", path.display()))
}

/// Device paths from `smartctl --scan` ("/dev/sda -d sat # /dev/sda [SAT], ATA device").
pub fn parse_scan(out: &str) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Serial from `smartctl -i` ("Serial Number:    1RJE48WM").
pub fn parse_serial(info: &str) -> Option<String> {
    info.lines()
        .filter_map(|l| l.trim().strip_prefix("Serial Number:"))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map serials to device paths on the runner's host.
///
/// Never fails: a host that can't be scanned yields an empty or partial map
/// and the drives are shown by serial instead.
pub fn discover(runner: &dyn CommandRunner, timeout: Duration) -> DeviceMap {
    let mut map = DeviceMap::new();
    let scan = match runner.run("smartctl --scan", timeout) {
        Ok(out) => out,
        Err(e)  => {
            tracing::warn!(host = %runner.target(), error = %e, "device discovery failed");
            return map;
        }
    };

    let devices = parse_scan(&scan);
    if devices.is_empty() {
        tracing::warn!(host = %runner.target(), "smartctl --scan found no devices");
    }
    for dev in devices {
        let info = match runner.run(&format!("smartctl -i {}", shell_quote(&dev)), timeout) {
            Ok(out) => out,
            Err(e)  => {
                tracing::warn!(device = %dev, error = %e, "identify failed");
                continue;
            }
        };
        match parse_serial(&info) {
            Some(serial) => {
                tracing::info!(%serial, device = %dev, "mapped");
                map.insert(serial, dev);
            }
            None => tracing::warn!(device = %dev, "no serial number reported"),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::command::mock::MockRunner;

    const SCAN: &str = "/dev/sda -d sat # /dev/sda [SAT], ATA device\n\
                        /dev/nvme0 -d nvme # /dev/nvme0, NVMe device\n\
                        /dev/sdb -d sat # /dev/sdb [SAT], ATA device\n";

    #[test]
    fn scan_lists_devices() {
        assert_eq!(parse_scan(SCAN), ["/dev/sda", "/dev/nvme0", "/dev/sdb"]);
        assert!(parse_scan("\n# comment\n").is_empty());
    }

    #[test]
    fn serial_from_identify() {
        let info = "Device Model:     WDC WD80EFAX-68KNBN0\nSerial Number:    1RJE48WM\nLU WWN Device Id: 5 0014ee\n";
        assert_eq!(parse_serial(info), Some("1RJE48WM".into()));
        assert_eq!(parse_serial("nothing here"), None);
    }

    #[test]
    fn discover_maps_identified_devices() {
        let runner = MockRunner::default()
            .reply("smartctl --scan", SCAN)
            .reply("smartctl -i '/dev/sda'", "Serial Number:    1RJE48WM\n")
            .reply("smartctl -i '/dev/nvme0'", "Serial Number:    S64DNX0R123456\n")
            .timeout("smartctl -i '/dev/sdb'");
        let map = discover(&runner, Duration::from_secs(1));
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("1RJE48WM").map(String::as_str), Some("/dev/sda"));
        assert_eq!(map.get("S64DNX0R123456").map(String::as_str), Some("/dev/nvme0"));
    }

    #[test]
    fn unreachable_host_gives_empty_map() {
        assert!(discover(&MockRunner::default(), Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps").join("device_map.json");
        let mut map = DeviceMap::new();
        map.insert("1RJE48WM".into(), "/dev/sda".into());
        save(&path, &map).unwrap();
        assert_eq!(load(&path).unwrap(), map);
    }

    #[test]
    fn invalid_map_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[1,2]").unwrap();
        assert!(load(&path).is_err());
    }
}
