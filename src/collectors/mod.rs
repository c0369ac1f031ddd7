pub mod attrlog;
pub mod command;
pub mod device_map;
pub mod remote;
pub mod thresholds;
