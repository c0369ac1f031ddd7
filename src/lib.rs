//! Drive health analysis for NAS hosts that record SMART attribute logs
//! (`smartd -A`). Reads the logs locally or over ssh, classifies each drive
//! and summarises the system.

pub mod analysis;
pub mod collectors;
pub mod config;
pub mod models;
pub mod report;
