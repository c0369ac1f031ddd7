use crate::collectors::attrlog::{self, FILE_PREFIX};
use crate::collectors::command::{shell_quote, CommandRunner};
use crate::models::raw::DriveLog;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Printed after the listing only when the directory was readable. Its
/// absence means ssh, the shell or the directory failed.
const LISTED_MARKER: &str = "::nashealth-listed::";

/// Shell line that lists attrlogs in `dir` and then prints the marker.
/// An existing directory with no logs prints just the marker.
pub fn list_command(dir: &str) -> String {
    let dir = shell_quote(dir);
    format!(
        "if [ -d {d} ] && [ -r {d} ]; then ls -1 {d}/{p}*.csv 2>/dev/null; echo '{m}'; fi",
        d = dir,
        p = FILE_PREFIX,
        m = LISTED_MARKER,
    )
}

/// Fetch attribute logs from `dir` on the runner's host (`ls`, then `cat` per file).
///
/// An unreachable host or unreadable directory is an error; a file that
/// can't be fetched is skipped.
pub fn read_remote(runner: &dyn CommandRunner, dir: &str, timeout: Duration) -> Result<Vec<DriveLog>> {
    let dir = dir.trim_end_matches('/');
    let listing = runner
        .run(&list_command(dir), timeout)
        .with_context(|| format!("cannot list {}:{}", runner.target(), dir))?;

    let lines: Vec<&str> = listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.last() != Some(&LISTED_MARKER) {
        bail!("cannot list {}:{}: host unreachable or directory unreadable", runner.target(), dir);
    }

    let mut paths = lines[..lines.len() - 1].to_vec();
    paths.sort_by(|a, b| file_name(a).cmp(file_name(b)));
    tracing::info!(host = %runner.target(), dir, files = paths.len(), "remote attribute logs listed");

    let mut logs = Vec::with_capacity(paths.len());
    for path in paths {
        let name = file_name(path);
        let content = match runner.run(&format!("cat {}", shell_quote(path)), timeout) {
            Ok(c)  => c,
            Err(e) => {
                tracing::warn!(host = %runner.target(), file = %path, error = %e, "skipping remote log");
                continue;
            }
        };
        match attrlog::log_from_contents(name, &content) {
            Some(log) => logs.push(log),
            None      => tracing::warn!(file = %path, "unrecognised attrlog name, skipped"),
        }
    }
    Ok(logs)
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
