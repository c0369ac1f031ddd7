use crate::models::drive::{DeltaState, Drive, HealthStatus, ThresholdSource};
use crate::models::smart::AttributeId;
use crate::models::system::SystemHealth;
use anyhow::Result;
use crossterm::style::Stylize;

fn paint(text: String, status: HealthStatus, color: bool) -> String {
    if !color {
        return text;
    }
    match status {
        HealthStatus::Healthy  => text.green().to_string(),
        HealthStatus::Warning  => text.yellow().to_string(),
        HealthStatus::Critical => text.red().bold().to_string(),
    }
}

fn temp_status(temp: Option<i32>, drive: &Drive) -> HealthStatus {
    let t = drive.thresholds();
    match temp {
        Some(v) if v >= t.critical() => HealthStatus::Critical,
        Some(v) if v >= t.warning()  => HealthStatus::Warning,
        _                            => HealthStatus::Healthy,
    }
}

fn fmt_temp(t: Option<i32>) -> String {
    t.map(|v| format!("{}°C", v)).unwrap_or_else(|| "—".to_string())
}

fn attr_name(id: &AttributeId) -> String {
    match id {
        AttributeId::Ata(5)   => "Reallocated_Sector_Ct (5)".into(),
        AttributeId::Ata(197) => "Current_Pending_Sector (197)".into(),
        AttributeId::Ata(198) => "Offline_Uncorrectable (198)".into(),
        AttributeId::Ata(199) => "UDMA_CRC_Error_Count (199)".into(),
        AttributeId::Ata(n)   => format!("attribute {}", n),
        AttributeId::Nvme(n)  => n.clone(),
    }
}

/// Human-readable health report, colour-coded by status when `color` is set.
pub fn generate(system: &SystemHealth, color: bool) -> String {
    let mut out = String::new();
    let rule = "═".repeat(60);

    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("  NAS Drive Health Report: window ending {}\n", system.analyzed_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(&format!("{}\n\n", rule));

    // ── Summary ────────────────────────────────────────────────────────
    out.push_str("── Summary ─────────────────────────────────────────────\n");
    out.push_str(&format!(
        "  Overall:          {}\n",
        paint(system.overall_status.label().trim().to_string(), system.overall_status, color)
    ));
    out.push_str(&format!(
        "  Drives:           {} ({} ATA, {} NVMe)\n",
        system.total_drives, system.ata_drives, system.nvme_drives
    ));
    out.push_str(&format!(
        "    {}  {}  {}\n",
        paint(format!("healthy {}", system.healthy_drives), HealthStatus::Healthy, color),
        paint(format!("warning {}", system.warning_drives), HealthStatus::Warning, color),
        paint(format!("critical {}", system.critical_drives), HealthStatus::Critical, color),
    ));
    out.push_str(&format!("  Max temperature:  {}\n", fmt_temp(system.max_temperature)));
    out.push_str(&format!("  New errors:       {}\n", system.total_errors_new));
    if system.drives_without_data > 0 {
        out.push_str(&format!("  No data:          {} drive(s)\n", system.drives_without_data));
    }
    if system.partial {
        out.push_str(&paint("  Partial result: run was cancelled\n".to_string(), HealthStatus::Warning, color));
    }
    out.push('\n');

    // ── Drives ─────────────────────────────────────────────────────────
    out.push_str(&format!("── Drives ({}) ──────────────────────────────────────────\n", system.drives.len()));
    if system.drives.is_empty() {
        out.push_str("  No attribute logs found\n\n");
        return out;
    }
    out.push_str(&format!(
        "  {:<10} {:<4} {:<4} {:>6} {:>6} {:>7} {:>4} {:>4} {:>7}  {}\n",
        "Device", "Type", "Stat", "Temp", "Max", "Limits", "New", "Old", "Age", "Serial"
    ));
    out.push_str(&format!("  {}\n", "─".repeat(76)));

    for d in &system.drives {
        let limits = format!(
            "{}/{}",
            d.temperature_warning.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            d.temperature_critical.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
        );
        let age = d.info.power_on_hours
            .filter(|h| *h > 0)
            .map(|h| format!("{}d", h / 24))
            .unwrap_or_else(|| "N/A".into());

        out.push_str(&format!(
            "  {:<10} {:<4} {} {} {} {:>7} {:>4} {:>4} {:>7}  {}\n",
            d.display_name(),
            d.family.label().trim(),
            paint(format!("{:<4}", d.health().label().trim()), d.health(), color),
            paint(format!("{:>6}", fmt_temp(d.temperature_current)), temp_status(d.temperature_current, d), color),
            paint(format!("{:>6}", fmt_temp(d.temperature_max_window)), temp_status(d.temperature_max_window, d), color),
            limits,
            d.errors_24h_new,
            d.errors_24h_existing,
            age,
            d.serial,
        ));

        for delta in &d.error_deltas {
            let (status, what) = match delta.state {
                DeltaState::New      => (HealthStatus::Critical, "new"),
                DeltaState::Existing => (HealthStatus::Warning, "existing"),
            };
            let change = match &delta.baseline {
                Some(b) => format!("{} -> {}", b, delta.latest),
                None    => delta.latest.to_string(),
            };
            out.push_str(&format!(
                "      {}\n",
                paint(format!("{}: {} ({})", attr_name(&delta.attribute), change, what), status, color)
            ));
        }
        if let Some(spare) = d.info.available_spare_pct {
            let used = d.info.percentage_used.map(|u| format!(", {:.0}% used", u)).unwrap_or_default();
            out.push_str(&format!("      spare {:.0}%{}\n", spare, used));
        }
        if d.diagnostics.no_data {
            out.push_str("      no readings in log\n");
        }
        let dropped = d.diagnostics.rows_dropped + d.diagnostics.records_missing_serial;
        if dropped > 0 || d.diagnostics.fields_malformed > 0 {
            out.push_str(&format!(
                "      skipped {} row(s), {} malformed field(s)\n",
                dropped, d.diagnostics.fields_malformed
            ));
        }
        if d.diagnostics.threshold_source == ThresholdSource::Default && d.device_path.is_some() {
            if let Some(reason) = &d.diagnostics.threshold_fallback_reason {
                out.push_str(&format!("      default limits ({})\n", reason));
            }
        }
    }
    out.push('\n');
    out.push_str(&format!("{}\n", rule));
    out
}

/// Pretty JSON of the whole result. History is left out unless asked for.
pub fn to_json(system: &SystemHealth, with_history: bool) -> Result<String> {
    if with_history {
        return Ok(serde_json::to_string_pretty(system)?);
    }
    let mut trimmed = system.clone();
    trimmed.drives = trimmed.drives.into_iter().map(Drive::without_history).collect();
    Ok(serde_json::to_string_pretty(&trimmed)?)
}
