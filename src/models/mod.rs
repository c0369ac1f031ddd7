//! Data types shared by the collectors, the analysis core and the report.

pub mod drive;
pub mod raw;
pub mod smart;
pub mod system;

use std::collections::BTreeMap;

/// Serial number -> device path (e.g. "1RJE48WM" -> "/dev/sda"). Display only.
pub type DeviceMap = BTreeMap<String, String>;
